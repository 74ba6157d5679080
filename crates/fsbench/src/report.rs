//! Tab-separated output.
//!
//! One header line, or one data row per measurement plus a
//! sequential-equivalent row for parallel runs. Numbers use Rust's shortest
//! round-trip formatting so downstream scripts can parse them losslessly;
//! infinities are spelled `+Inf`/`-Inf`.

use crate::measurement::Measurement;
use std::fmt::Display;
use std::io::{self, Write};

/// Column names, in output order.
pub const HEADER: [&str; 13] = [
    "fs",
    "name_cache",
    "attr_cache",
    "neg_name_cache",
    "kernel_cache",
    "operation",
    "exists",
    "kiters",
    "parallel",
    "timeSec",
    "seqTimeSec",
    "speedup",
    "usPerOp",
];

/// A float column. Non-finite values keep the `+Inf`/`-Inf`/`NaN` spelling
/// existing result files already contain.
struct Float(f64);

impl Display for Float {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = self.0;
        if v.is_nan() {
            f.write_str("NaN")
        } else if v.is_infinite() {
            f.write_str(if v.is_sign_positive() { "+Inf" } else { "-Inf" })
        } else {
            Display::fmt(&v, f)
        }
    }
}

fn write_tsv<W: Write>(out: &mut W, fields: &[&dyn Display]) -> io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_all(b"\t")?;
        }
        write!(out, "{field}")?;
    }
    out.write_all(b"\n")
}

/// Write the header row.
pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    let fields: Vec<&dyn Display> = HEADER.iter().map(|h| h as &dyn Display).collect();
    write_tsv(out, &fields)
}

/// Write the row for a single measurement.
pub fn write_row<W: Write>(out: &mut W, m: &Measurement) -> io::Result<()> {
    let opts = &m.mount_options;
    let work = &m.workload;
    write_tsv(
        out,
        &[
            &m.fs_ident,
            &opts.name_cache,
            &opts.attr_cache,
            &opts.neg_name_cache,
            &opts.kernel_cache,
            &work.operation,
            &work.exists,
            &work.kiters,
            &m.parallel,
            &Float(m.elapsed_secs),
            &Float(m.seq_secs),
            &Float(m.speedup()),
            &Float(m.micros_per_op()),
        ],
    )
}

/// Write the measurement, followed by its sequential equivalent if it ran in
/// parallel.
pub fn write_rows<W: Write>(out: &mut W, m: &Measurement) -> io::Result<()> {
    write_row(out, m)?;
    if m.parallel {
        write_row(out, &m.sequential_equivalent())?;
    }
    Ok(())
}
