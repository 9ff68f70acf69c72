//! Triangular index packing for unordered vertex pairs.
//!
//! Every x-column of the formulation and every explicit edge weight is
//! addressed through [`sxpos`], so the layout here is load-bearing.

/// Number of unordered pairs `{i, j}` with `i ≠ j` among `n` vertices.
#[inline]
pub const fn num_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Packed index of the pair `(i, j)` with `i < j < n`.
///
/// The pairs are laid out row by row:
/// `(0,1) (0,2) … (0,n−1) (1,2) … (n−2,n−1)`, i.e.
/// `i·n + j − (i+1)(i+2)/2`.
///
/// # Examples
///
/// ```
/// use u_cptp::distance::sxpos;
///
/// assert_eq!(sxpos(4, 0, 1), 0);
/// assert_eq!(sxpos(4, 0, 3), 2);
/// assert_eq!(sxpos(4, 1, 2), 3);
/// assert_eq!(sxpos(4, 2, 3), 5);
/// ```
#[inline]
pub fn sxpos(n: usize, i: usize, j: usize) -> usize {
    debug_assert!(i < j, "sxpos requires i < j (got {i}, {j})");
    debug_assert!(j < n, "sxpos index {j} out of range for n = {n}");
    i * n + j - (i + 1) * (i + 2) / 2
}

/// [`sxpos`] for an unordered pair given in any order.
#[inline]
pub fn pair_index(n: usize, a: usize, b: usize) -> usize {
    if a < b {
        sxpos(n, a, b)
    } else {
        sxpos(n, b, a)
    }
}
