//! # Lendbook Core
//!
//! Domain types và quy tắc thuần cho sổ cho vay:
//! - Sinh mã khoản vay / biên nhận / lender
//! - Lãi đơn theo tháng, chia thanh toán lãi/gốc
//! - Mô phỏng lịch trả nợ
//! - Loan, Payment, các bên tham gia và audit events

pub mod allocation;
pub mod amortization;
pub mod code;
pub mod error;
pub mod event;
pub mod loan;
pub mod money;
pub mod party;
pub mod payment;
pub mod settings;

pub use allocation::{allocate, Allocation, Tender};
pub use amortization::{simulate, Schedule, ScheduleRow, MAX_TERM_MONTHS};
pub use code::{next_code, parse_code, CodeSequence, SequenceKind};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use event::{Event, EventType};
pub use loan::{InterestTiming, Loan, LoanDetails, LoanStanding, LoanStatus, NewLoan};
pub use money::{ensure_currency_amount, monthly_interest, round_currency, MAX_CURRENCY_AMOUNT};
pub use party::{Client, ClientDetails, CoDebtor, Lender, NewCoDebtor, NewLender};
pub use payment::{NewPayment, Payment, PaymentKind, PaymentMethod};
pub use settings::LedgerSettings;
