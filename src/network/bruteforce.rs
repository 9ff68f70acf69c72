//! Exhaustive minimum cut, used as a reference oracle.

use super::flow::{Color, FlowNetwork, FlowValue, MaxFlowResult};

/// Minimum `source`/`sink` cut by enumerating all 2^N bipartitions with the
/// source BLACK and the sink WHITE.
///
/// Only meant for small networks in tests.
pub fn bruteforce_max_flow<F: FlowValue>(
    net: &FlowNetwork<F>,
    source: usize,
    sink: usize,
) -> MaxFlowResult<F> {
    let n = net.nnodes();
    assert!(n <= 24, "bruteforce max flow is limited to 24 nodes");
    assert_ne!(source, sink, "source and sink must differ");

    let mut best: Option<(F, u32)> = None;
    let mut colors = vec![Color::White; n];
    for mask in 0u32..(1u32 << n) {
        if mask & (1 << source) == 0 || mask & (1 << sink) != 0 {
            continue;
        }
        for (i, c) in colors.iter_mut().enumerate() {
            *c = if mask & (1 << i) != 0 {
                Color::Black
            } else {
                Color::White
            };
        }
        let value = net.cut_value(&colors);
        if best.map_or(true, |(v, _)| value < v) {
            best = Some((value, mask));
        }
    }

    let (maxflow, mask) = best.unwrap_or((F::ZERO, 1 << source));
    MaxFlowResult {
        source,
        sink,
        maxflow,
        colors: (0..n)
            .map(|i| {
                if mask & (1 << i) != 0 {
                    Color::Black
                } else {
                    Color::White
                }
            })
            .collect(),
    }
}
