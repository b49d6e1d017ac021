// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn table_aligns_columns() {
    let rendered = render_table(
        &["ID", "STATUS"],
        &[
            vec!["a1".to_string(), "running".to_string()],
            vec!["agent-long".to_string(), "done".to_string()],
        ],
    );
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "ID          STATUS ");
    assert_eq!(lines[1], "a1          running");
    assert_eq!(lines[2], "agent-long  done   ");
}

#[parameterized(
    seconds = { 42_000, "42s" },
    minutes = { 192_000, "3m12s" },
    hours = { 7_500_000, "2h5m" },
    days = { 90_000_000, "1d1h" },
)]
fn elapsed_formats(ms: u64, expected: &str) {
    assert_eq!(format_elapsed_ms(ms), expected);
}
