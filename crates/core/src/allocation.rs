//! # Allocation Module
//!
//! Chia một khoản thanh toán thành phần lãi và phần gốc.

use crate::error::{CoreError, CoreResult};
use crate::money::{ensure_currency_amount, ensure_non_negative, ensure_positive};
use crate::payment::PaymentKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Khoản tiền khách đưa và phần chia (nếu người nhập tự chia)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tender {
    pub total: Decimal,
    pub interest: Option<Decimal>,
    pub principal: Option<Decimal>,
}

impl Tender {
    /// Chỉ có tổng, để hệ thống tự chia
    pub fn total(total: Decimal) -> Self {
        Self {
            total,
            interest: None,
            principal: None,
        }
    }

    /// Tổng kèm phần chia do người nhập chỉ định
    pub fn split(total: Decimal, interest: Decimal, principal: Decimal) -> Self {
        Self {
            total,
            interest: Some(interest),
            principal: Some(principal),
        }
    }

    fn is_auto(&self) -> bool {
        self.interest.unwrap_or(Decimal::ZERO).is_zero()
            && self.principal.unwrap_or(Decimal::ZERO).is_zero()
    }
}

/// Kết quả chia
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub total: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    pub kind: PaymentKind,
    /// true nếu phần chia do hệ thống tính
    pub auto_computed: bool,
}

/// Chia `tender` dựa trên lãi đến hạn và dư nợ hiện tại của khoản vay.
///
/// - Không chỉ định phần chia: lãi = min(lãi đến hạn, tổng), gốc = phần còn lại.
/// - Có chỉ định: lãi + gốc phải bằng tổng.
/// - Gốc không được vượt dư nợ.
pub fn allocate(tender: Tender, interest_due: Decimal, balance: Decimal) -> CoreResult<Allocation> {
    ensure_positive("Payment total", tender.total)?;
    ensure_currency_amount("Payment total", tender.total)?;

    let auto_computed = tender.is_auto();
    let (interest, principal) = if auto_computed {
        let interest = interest_due.max(Decimal::ZERO).min(tender.total);
        (interest, tender.total - interest)
    } else {
        let interest = tender.interest.unwrap_or(Decimal::ZERO);
        let principal = tender.principal.unwrap_or(Decimal::ZERO);
        ensure_non_negative("Interest portion", interest)?;
        ensure_non_negative("Principal portion", principal)?;
        ensure_currency_amount("Interest portion", interest)?;
        ensure_currency_amount("Principal portion", principal)?;
        if interest + principal != tender.total {
            return Err(CoreError::AllocationMismatch {
                interest,
                principal,
                total: tender.total,
            });
        }
        (interest, principal)
    };

    if principal > balance {
        return Err(CoreError::PrincipalExceedsBalance { principal, balance });
    }

    Ok(Allocation {
        total: tender.total,
        interest,
        principal,
        kind: PaymentKind::classify(interest, principal, balance),
        auto_computed,
    })
}
