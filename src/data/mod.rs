/// Data layer: measurement tables, loading, and the cycle evaluation core.
///
/// Architecture:
/// ```text
///  .xlsx / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → MeasurementTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ MeasurementTable │  infusion / injection readings
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cycles   │  segment → per-cycle peaks → pass/fail rows
///   └──────────┘
/// ```

pub mod cycles;
pub mod loader;
pub mod model;
