/// Data layer: sidecar metadata, binary dump loading, tensor reshaping.
///
/// Architecture:
/// ```text
///  eval.bin.meta.json   eval.bin
///        │                 │
///        ▼                 ▼
///   ┌───────────────────────────┐
///   │  loader                    │  parse JSON, decode f32 → EvalDump
///   └───────────────────────────┘
///        │
///        ▼
///   ┌───────────────────────────┐
///   │ EvalTensor                 │  (samples, 1 + 2*ticks, classes)
///   └───────────────────────────┘
/// ```

pub mod loader;
pub mod model;
