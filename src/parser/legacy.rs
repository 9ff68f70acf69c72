//! Legacy test-instance format.
//!
//! ```text
//! C V Q
//! 0 x y demand profit
//! 1 x y demand profit
//! ...
//! C x y demand profit
//! ```
//!
//! Node ids count from 0 and must appear in order.

use std::fs;
use std::path::Path;

use super::numbers::{parse_f64, parse_usize};
use crate::error::{Error, Result};
use crate::models::{Instance, Point};

/// Parses legacy test-instance text. `path` is only used in error messages.
///
/// ```
/// use std::path::Path;
/// use u_cptp::parser::parse_legacy_str;
///
/// let inst = parse_legacy_str("1 1 10\n0 0 0 0 0\n1 3 4 2 7\n", Path::new("t.txt")).unwrap();
/// assert_eq!(inst.num_customers(), 1);
/// assert!((inst.dist(0, 1) - 5.0).abs() < 1e-10);
/// ```
pub fn parse_legacy_str(text: &str, path: &Path) -> Result<Instance> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(k, l)| (k + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (hdr_line, hdr) = lines
        .next()
        .ok_or_else(|| Error::parse(path, 1, "missing header `C V Q`"))?;
    let fields: Vec<&str> = hdr.split_whitespace().collect();
    let (num_customers, num_vehicles, capacity) = match fields.as_slice() {
        [c, v, q] => (
            parse_usize(c),
            parse_usize(v),
            parse_f64(q),
        ),
        _ => (None, None, None),
    };
    let (Some(num_customers), Some(num_vehicles), Some(capacity)) =
        (num_customers, num_vehicles, capacity)
    else {
        return Err(Error::parse(path, hdr_line, format!("invalid header `{hdr}`")));
    };

    let n = num_customers + 1;
    let mut positions = Vec::with_capacity(n);
    let mut demands = Vec::with_capacity(n);
    let mut profits = Vec::with_capacity(n);

    for (line, content) in lines {
        let fields: Vec<&str> = content.split_whitespace().collect();
        let expected = positions.len();
        let parsed = match fields.as_slice() {
            [i, x, y, d, p] => parse_usize(i).zip(
                parse_f64(x)
                    .zip(parse_f64(y))
                    .zip(parse_f64(d).zip(parse_f64(p))),
            ),
            _ => None,
        };
        let Some((idx, ((x, y), (demand, profit)))) = parsed else {
            return Err(Error::parse(path, line, format!("invalid node line `{content}`")));
        };
        if idx != expected {
            return Err(Error::parse(
                path,
                line,
                format!("expected idx {expected} but found {idx}"),
            ));
        }
        if expected == n {
            return Err(Error::parse(path, line, format!("more than {n} nodes")));
        }
        positions.push(Point::new(x, y));
        demands.push(demand);
        profits.push(profit);
    }

    if positions.len() != n {
        return Err(Error::invalid_input(format!(
            "{}: expected {num_customers} customers but found {}",
            path.display(),
            positions.len().saturating_sub(1)
        )));
    }

    Ok(Instance::new(capacity, positions, demands, profits)?.with_num_vehicles(num_vehicles))
}

/// Reads and parses a legacy test-instance file.
pub fn parse_legacy(path: impl AsRef<Path>) -> Result<Instance> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_legacy_str(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Instance> {
        parse_legacy_str(text, Path::new("legacy.txt"))
    }

    #[test]
    fn test_parse_two_customers() {
        let inst = parse("2 1 2.0\n0 0 0 0 0\n1 3 0 1 10\n2 0 4 1 10\n").expect("valid");
        assert_eq!(inst.num_customers(), 2);
        assert_eq!(inst.vehicle_cap(), 2.0);
        assert_eq!(inst.profits(), &[0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_out_of_order_index() {
        let err = parse("1 1 5\n0 0 0 0 0\n2 1 1 1 1\n").expect_err("bad index");
        assert!(matches!(err, Error::Parse { line: 3, .. }));
    }

    #[test]
    fn test_customer_count_mismatch() {
        assert!(parse("3 1 5\n0 0 0 0 0\n1 1 1 1 1\n").is_err());
        assert!(parse("").is_err());
        assert!(parse("1 1\n").is_err());
    }
}
