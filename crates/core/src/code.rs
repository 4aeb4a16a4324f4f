//! # Code Module
//!
//! Sinh mã định danh dạng `<prefix><số có đệm 0>`: mã khoản vay (PR000001),
//! số biên nhận (REC00000001) và mã người cho vay (PRE001).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Độ rộng phần số của mã khoản vay
pub const LOAN_CODE_WIDTH: usize = 6;
/// Độ rộng phần số của số biên nhận
pub const RECEIPT_WIDTH: usize = 8;
/// Độ rộng phần số của mã người cho vay
pub const LENDER_CODE_WIDTH: usize = 3;

/// Loại dãy mã
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Loan,
    Receipt,
    Lender,
}

impl SequenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::Loan => "loan",
            SequenceKind::Receipt => "receipt",
            SequenceKind::Lender => "lender",
        }
    }

    /// Độ rộng cố định của phần số
    pub fn width(&self) -> usize {
        match self {
            SequenceKind::Loan => LOAN_CODE_WIDTH,
            SequenceKind::Receipt => RECEIPT_WIDTH,
            SequenceKind::Lender => LENDER_CODE_WIDTH,
        }
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Một dãy mã: prefix + độ rộng.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSequence {
    pub kind: SequenceKind,
    pub prefix: String,
}

impl CodeSequence {
    pub fn new(kind: SequenceKind, prefix: &str) -> Self {
        Self {
            kind,
            prefix: prefix.to_string(),
        }
    }

    pub fn width(&self) -> usize {
        self.kind.width()
    }

    /// Mã tiếp theo sau `last`
    pub fn next(&self, last: Option<&str>) -> String {
        next_code(&self.prefix, self.width(), last)
    }

    /// Render mã với số thứ tự cho trước
    pub fn render(&self, number: u64) -> String {
        render_code(&self.prefix, self.width(), number)
    }
}

/// Tách phần số của mã `<prefix><digits>`.
///
/// Trả về `None` nếu mã không bắt đầu bằng prefix, phần còn lại rỗng
/// hoặc chứa ký tự không phải chữ số.
pub fn parse_code(prefix: &str, code: &str) -> Option<u64> {
    let digits = code.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Render `<prefix><number>` với phần số đệm 0 tới `width` chữ số.
pub fn render_code(prefix: &str, width: usize, number: u64) -> String {
    format!("{}{:0width$}", prefix, number, width = width)
}

/// Mã tiếp theo trong dãy.
///
/// Không có mã trước, hoặc mã trước không parse được, thì bắt đầu lại từ 1.
pub fn next_code(prefix: &str, width: usize, last: Option<&str>) -> String {
    let next = last
        .and_then(|code| parse_code(prefix, code))
        .map(|n| n + 1)
        .unwrap_or(1);
    render_code(prefix, width, next)
}
