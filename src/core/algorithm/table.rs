use super::{
    AlgorithmEdge, AlgorithmNode, AlgorithmTopology, EdgeKind, OperatorRole, ALGORITHM_COUNT,
};

const C: OperatorRole = OperatorRole::Carrier;
const M: OperatorRole = OperatorRole::Modulator;

const fn op(id: u8, role: OperatorRole) -> AlgorithmNode {
    AlgorithmNode { id, role }
}

const fn edge(from: u8, to: u8) -> AlgorithmEdge {
    AlgorithmEdge {
        from,
        to,
        kind: EdgeKind::Modulation,
    }
}

// Edges are grouped by source operator, ascending. The declared order is the IM slot order the
// firmware uses, so don't reorder them.
macro_rules! dx {
    ($id:literal, $name:literal, [$r1:ident, $r2:ident, $r3:ident, $r4:ident, $r5:ident, $r6:ident],
     [$(($from:literal, $to:literal)),* $(,)?]) => {
        AlgorithmTopology {
            id: $id,
            name: $name,
            nodes: &[op(1, $r1), op(2, $r2), op(3, $r3), op(4, $r4), op(5, $r5), op(6, $r6)],
            edges: &[$(edge($from, $to)),*],
        }
    };
}

/// The 32 six-operator routings, indexed by the wire algorithm number.
#[rustfmt::skip]
pub static ALGORITHMS: [AlgorithmTopology; ALGORITHM_COUNT] = [
    dx!("alg1",  "DX 1 – 2 Carriers",  [C, M, C, M, M, M], [(2, 1), (4, 3), (5, 4), (6, 5), (6, 6)]),
    dx!("alg2",  "DX 2 – 2 Carriers",  [C, M, C, M, M, M], [(2, 1), (2, 2), (4, 3), (5, 4), (6, 5)]),
    dx!("alg3",  "DX 3 – 2 Carriers",  [C, M, M, C, M, M], [(2, 1), (3, 2), (5, 4), (6, 5), (6, 6)]),
    dx!("alg4",  "DX 4 – 2 Carriers",  [C, M, M, C, M, M], [(2, 1), (3, 2), (4, 4), (5, 4), (6, 5)]),
    dx!("alg5",  "DX 5 – 3 Carriers",  [C, M, C, M, C, M], [(2, 1), (4, 3), (6, 5), (6, 6)]),
    dx!("alg6",  "DX 6 – 3 Carriers",  [C, M, C, M, C, M], [(2, 1), (4, 3), (5, 5), (6, 5)]),
    dx!("alg7",  "DX 7 – 2 Carriers",  [C, M, C, M, M, M], [(2, 1), (4, 3), (5, 3), (6, 5), (6, 6)]),
    dx!("alg8",  "DX 8 – 2 Carriers",  [C, M, C, M, M, M], [(2, 1), (4, 3), (4, 4), (5, 3), (6, 5)]),
    dx!("alg9",  "DX 9 – 2 Carriers",  [C, M, C, M, M, M], [(2, 1), (2, 2), (4, 3), (5, 3), (6, 5)]),
    dx!("alg10", "DX 10 – 2 Carriers", [C, M, M, C, M, M], [(2, 1), (3, 2), (3, 3), (5, 4), (6, 4)]),
    dx!("alg11", "DX 11 – 2 Carriers", [C, M, M, C, M, M], [(2, 1), (3, 2), (5, 4), (6, 4), (6, 6)]),
    dx!("alg12", "DX 12 – 2 Carriers", [C, M, C, M, M, M], [(2, 1), (2, 2), (4, 3), (5, 3), (6, 3)]),
    dx!("alg13", "DX 13 – 2 Carriers", [C, M, C, M, M, M], [(2, 1), (4, 3), (5, 3), (6, 3), (6, 6)]),
    dx!("alg14", "DX 14 – 2 Carriers", [C, M, C, M, M, M], [(2, 1), (4, 3), (5, 4), (6, 4), (6, 6)]),
    dx!("alg15", "DX 15 – 2 Carriers", [C, M, C, M, M, M], [(2, 1), (2, 2), (4, 3), (5, 4), (6, 4)]),
    dx!("alg16", "DX 16 – 1 Carrier",  [C, M, M, M, M, M], [(2, 1), (3, 1), (4, 3), (5, 1), (6, 5), (6, 6)]),
    dx!("alg17", "DX 17 – 1 Carrier",  [C, M, M, M, M, M], [(2, 1), (2, 2), (3, 1), (4, 3), (5, 1), (6, 5)]),
    dx!("alg18", "DX 18 – 1 Carrier",  [C, M, M, M, M, M], [(2, 1), (3, 1), (3, 3), (4, 1), (5, 4), (6, 5)]),
    dx!("alg19", "DX 19 – 3 Carriers", [C, M, M, C, C, M], [(2, 1), (3, 2), (6, 4), (6, 5), (6, 6)]),
    dx!("alg20", "DX 20 – 3 Carriers", [C, C, M, C, M, M], [(3, 1), (3, 2), (3, 3), (5, 4), (6, 4)]),
    dx!("alg21", "DX 21 – 4 Carriers", [C, C, M, C, C, M], [(3, 1), (3, 2), (3, 3), (6, 4), (6, 5)]),
    dx!("alg22", "DX 22 – 4 Carriers", [C, M, C, C, C, M], [(2, 1), (6, 3), (6, 4), (6, 5), (6, 6)]),
    dx!("alg23", "DX 23 – 4 Carriers", [C, C, M, C, C, M], [(3, 2), (6, 4), (6, 5), (6, 6)]),
    dx!("alg24", "DX 24 – 5 Carriers", [C, C, C, C, C, M], [(6, 3), (6, 4), (6, 5), (6, 6)]),
    dx!("alg25", "DX 25 – 5 Carriers", [C, C, C, C, C, M], [(6, 4), (6, 5), (6, 6)]),
    dx!("alg26", "DX 26 – 3 Carriers", [C, C, M, C, M, M], [(3, 2), (5, 4), (6, 4), (6, 6)]),
    dx!("alg27", "DX 27 – 3 Carriers", [C, C, M, C, M, M], [(3, 2), (3, 3), (5, 4), (6, 4)]),
    dx!("alg28", "DX 28 – 3 Carriers", [C, M, C, M, M, C], [(2, 1), (4, 3), (5, 4), (5, 5)]),
    dx!("alg29", "DX 29 – 4 Carriers", [C, C, C, M, C, M], [(4, 3), (6, 5), (6, 6)]),
    dx!("alg30", "DX 30 – 4 Carriers", [C, C, C, M, M, C], [(4, 3), (5, 4), (5, 5)]),
    dx!("alg31", "DX 31 – 5 Carriers", [C, C, C, C, C, M], [(6, 5), (6, 6)]),
    dx!("alg32", "DX 32 – 6 Carriers", [C, C, C, C, C, C], [(6, 6)]),
];
