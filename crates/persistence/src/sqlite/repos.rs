//! Repository implementations cho SQLite
//!
//! CRUD operations cho tất cả các tables. Các hàm nhận `SqliteExecutor`
//! nên dùng được với cả pool lẫn transaction (`&mut *tx`).

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, NaiveDate, Utc};
use lendbook_core::{
    Client, ClientDetails, CoDebtor, CodeSequence, Lender, Loan, LoanStatus, NewCoDebtor,
    Payment, PaymentMethod,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};

/// Thời gian chờ khi database đang bị khóa bởi writer khác
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pattern LIKE cho từ khóa tìm kiếm (bỏ qua nếu rỗng)
fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

// ============================================================================
// Sequence Repository
// ============================================================================

/// Repository cho code_sequences table
pub struct SequenceRepo;

impl SequenceRepo {
    /// Cấp mã tiếp theo của dãy.
    ///
    /// Mỗi cặp (kind, prefix) có một dòng riêng, đổi prefix rồi đổi lại vẫn
    /// tiếp tục đúng số. Phải gọi bên trong transaction ghi bản ghi mang mã
    /// đó. Dòng sequence được ghi trước khi đọc nên transaction giữ write
    /// lock tới khi commit.
    pub async fn issue(
        conn: &mut SqliteConnection,
        sequence: &CodeSequence,
    ) -> PersistenceResult<String> {
        let kind = sequence.kind.as_str();
        let prefix = sequence.prefix.as_str();

        sqlx::query(
            "INSERT INTO code_sequences (kind, prefix, last_code, updated_at) VALUES (?, ?, NULL, ?)
             ON CONFLICT(kind, prefix) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(kind)
        .bind(prefix)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let last: Option<String> = sqlx::query_scalar(
            "SELECT last_code FROM code_sequences WHERE kind = ? AND prefix = ?",
        )
        .bind(kind)
        .bind(prefix)
        .fetch_one(&mut *conn)
        .await?;

        let code = sequence.next(last.as_deref());

        sqlx::query("UPDATE code_sequences SET last_code = ? WHERE kind = ? AND prefix = ?")
            .bind(&code)
            .bind(kind)
            .bind(prefix)
            .execute(&mut *conn)
            .await?;

        debug!(kind, prefix, code = %code, "Issued code");
        Ok(code)
    }

    /// Mã cấp gần nhất của dãy
    pub async fn last_code<'e, E: SqliteExecutor<'e>>(
        exec: E,
        sequence: &CodeSequence,
    ) -> PersistenceResult<Option<String>> {
        let row = sqlx::query_as::<_, SequenceRow>(
            "SELECT kind, prefix, last_code FROM code_sequences WHERE kind = ? AND prefix = ?",
        )
        .bind(sequence.kind.as_str())
        .bind(sequence.prefix.as_str())
        .fetch_optional(exec)
        .await?;
        Ok(row.and_then(|r| r.last_code))
    }
}

// ============================================================================
// Lender Repository
// ============================================================================

/// Repository cho lenders table
pub struct LenderRepo;

impl LenderRepo {
    /// Lấy lender theo mã
    pub async fn get_by_code<'e, E: SqliteExecutor<'e>>(
        exec: E,
        code: &str,
    ) -> PersistenceResult<Lender> {
        let row = sqlx::query_as::<_, LenderRow>("SELECT * FROM lenders WHERE code = ?")
            .bind(code)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Lender", code))?;
        Lender::try_from(row)
    }

    /// Lấy tất cả lenders, sắp theo mã
    pub async fn list<'e, E: SqliteExecutor<'e>>(
        exec: E,
        active_only: bool,
    ) -> PersistenceResult<Vec<Lender>> {
        let rows = sqlx::query_as::<_, LenderRow>(
            "SELECT * FROM lenders WHERE (? = 0 OR active = 1) ORDER BY code",
        )
        .bind(active_only)
        .fetch_all(exec)
        .await?;
        rows.into_iter().map(Lender::try_from).collect()
    }

    /// Thêm lender mới
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        exec: E,
        lender: &Lender,
    ) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO lenders (code, first_name, last_name, national_id, default_rate, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&lender.code)
        .bind(&lender.first_name)
        .bind(&lender.last_name)
        .bind(&lender.national_id)
        .bind(lender.default_rate.to_string())
        .bind(lender.active)
        .bind(lender.created_at)
        .execute(exec)
        .await?;
        Ok(())
    }
}

// ============================================================================
// Client Repository
// ============================================================================

/// Điều kiện tìm kiếm client
#[derive(Debug, Clone, Default)]
pub struct ClientQuery {
    /// Tìm trong tên, họ, số căn cước, số điện thoại
    pub search: Option<String>,
    pub active: Option<bool>,
    pub limit: Option<u32>,
}

impl ClientQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search = Some(term.to_string());
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Repository cho clients table
pub struct ClientRepo;

impl ClientRepo {
    /// Lấy client theo ID
    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: i64,
    ) -> PersistenceResult<Client> {
        sqlx::query_as::<_, ClientRow>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .map(Client::from)
            .ok_or_else(|| PersistenceError::not_found("Client", &id.to_string()))
    }

    /// Tìm client theo số căn cước
    pub async fn find_by_national_id<'e, E: SqliteExecutor<'e>>(
        exec: E,
        national_id: &str,
    ) -> PersistenceResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>("SELECT * FROM clients WHERE national_id = ?")
            .bind(national_id)
            .fetch_optional(exec)
            .await?;
        Ok(row.map(Client::from))
    }

    /// Thêm client mới, trả về ID
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        exec: E,
        details: &ClientDetails,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO clients (first_name, last_name, national_id, primary_address, secondary_address,
                                  phone, alternate_phone, email, notes, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(details.first_name.trim())
        .bind(details.last_name.trim())
        .bind(details.national_id.trim())
        .bind(&details.primary_address)
        .bind(&details.secondary_address)
        .bind(&details.phone)
        .bind(&details.alternate_phone)
        .bind(&details.email)
        .bind(&details.notes)
        .bind(now)
        .bind(now)
        .execute(exec)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Cập nhật thông tin client
    pub async fn update<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: i64,
        details: &ClientDetails,
        now: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE clients SET first_name = ?, last_name = ?, national_id = ?, primary_address = ?,
                                secondary_address = ?, phone = ?, alternate_phone = ?, email = ?,
                                notes = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(details.first_name.trim())
        .bind(details.last_name.trim())
        .bind(details.national_id.trim())
        .bind(&details.primary_address)
        .bind(&details.secondary_address)
        .bind(&details.phone)
        .bind(&details.alternate_phone)
        .bind(&details.email)
        .bind(&details.notes)
        .bind(now)
        .bind(id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Client", &id.to_string()));
        }
        Ok(())
    }

    /// Bật/tắt client
    pub async fn set_active<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: i64,
        active: bool,
        now: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE clients SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(now)
            .bind(id)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Client", &id.to_string()));
        }
        Ok(())
    }

    /// Tìm kiếm client, sắp theo họ tên
    pub async fn search<'e, E: SqliteExecutor<'e>>(
        exec: E,
        query: &ClientQuery,
    ) -> PersistenceResult<Vec<Client>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM clients WHERE 1 = 1");

        if let Some(pattern) = like_pattern(query.search.as_deref()) {
            qb.push(" AND (first_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR (first_name || ' ' || last_name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR national_id LIKE ")
                .push_bind(pattern.clone())
                .push(" OR phone LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(active) = query.active {
            qb.push(" AND active = ").push_bind(active);
        }
        qb.push(" ORDER BY last_name, first_name, id");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb.build_query_as::<ClientRow>().fetch_all(exec).await?;
        Ok(rows.into_iter().map(Client::from).collect())
    }

    /// Đếm clients đang hoạt động
    pub async fn count_active<'e, E: SqliteExecutor<'e>>(exec: E) -> PersistenceResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE active = 1")
            .fetch_one(exec)
            .await?;
        Ok(count)
    }
}

// ============================================================================
// Co-debtor Repository
// ============================================================================

/// Repository cho codebtors table
pub struct CoDebtorRepo;

impl CoDebtorRepo {
    /// Lấy co-debtor theo ID
    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: i64,
    ) -> PersistenceResult<CoDebtor> {
        sqlx::query_as::<_, CoDebtorRow>("SELECT * FROM codebtors WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .map(CoDebtor::from)
            .ok_or_else(|| PersistenceError::not_found("CoDebtor", &id.to_string()))
    }

    /// Co-debtors của một client
    pub async fn list_by_client<'e, E: SqliteExecutor<'e>>(
        exec: E,
        client_id: i64,
    ) -> PersistenceResult<Vec<CoDebtor>> {
        let rows = sqlx::query_as::<_, CoDebtorRow>(
            "SELECT * FROM codebtors WHERE client_id = ? ORDER BY id",
        )
        .bind(client_id)
        .fetch_all(exec)
        .await?;
        Ok(rows.into_iter().map(CoDebtor::from).collect())
    }

    /// Thêm co-debtor, trả về ID
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        exec: E,
        client_id: i64,
        codebtor: &NewCoDebtor,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO codebtors (client_id, full_name, national_id, phone, address, relationship, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(client_id)
        .bind(codebtor.full_name.trim())
        .bind(codebtor.national_id.trim())
        .bind(&codebtor.phone)
        .bind(&codebtor.address)
        .bind(&codebtor.relationship)
        .bind(now)
        .execute(exec)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

// ============================================================================
// Loan Repository
// ============================================================================

/// Điều kiện lọc khoản vay
#[derive(Debug, Clone, Default)]
pub struct LoanQuery {
    /// Tìm trong mã khoản vay, tên client, số căn cước
    pub search: Option<String>,
    pub lender_code: Option<String>,
    pub client_id: Option<i64>,
    pub status: Option<LoanStatus>,
    /// Ngày bắt đầu trong khoảng [from, to]
    pub started_from: Option<NaiveDate>,
    pub started_to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl LoanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search = Some(term.to_string());
        self
    }

    pub fn lender(mut self, code: &str) -> Self {
        self.lender_code = Some(code.to_string());
        self
    }

    pub fn client(mut self, client_id: i64) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn status(mut self, status: LoanStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn started_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.started_from = Some(from);
        self.started_to = Some(to);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Repository cho loans table
pub struct LoanRepo;

impl LoanRepo {
    /// Lấy khoản vay theo mã
    pub async fn get_by_code<'e, E: SqliteExecutor<'e>>(
        exec: E,
        code: &str,
    ) -> PersistenceResult<Loan> {
        let row = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE code = ?")
            .bind(code)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Loan", code))?;
        Loan::try_from(row)
    }

    /// Lấy khoản vay theo ID
    pub async fn get_by_id<'e, E: SqliteExecutor<'e>>(
        exec: E,
        id: i64,
    ) -> PersistenceResult<Loan> {
        let row = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = ?")
            .bind(id)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Loan", &id.to_string()))?;
        Loan::try_from(row)
    }

    /// Thêm khoản vay mới, trả về ID
    pub async fn insert<'e, E: SqliteExecutor<'e>>(exec: E, loan: &Loan) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO loans (code, client_id, lender_code, codebtor_id, initial_amount, balance,
                                rate_percent, interest_timing, start_date, due_date, term_months,
                                note_photo, note_photo_back, notes, status, paid_at, cancel_reason,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&loan.code)
        .bind(loan.client_id)
        .bind(&loan.lender_code)
        .bind(loan.codebtor_id)
        .bind(loan.initial_amount.to_string())
        .bind(loan.balance.to_string())
        .bind(loan.rate_percent.to_string())
        .bind(loan.interest_timing.as_str())
        .bind(loan.start_date)
        .bind(loan.due_date)
        .bind(loan.term_months.map(i64::from))
        .bind(&loan.note_photo)
        .bind(&loan.note_photo_back)
        .bind(&loan.notes)
        .bind(loan.status.as_str())
        .bind(loan.paid_at)
        .bind(&loan.cancel_reason)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(exec)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Ghi dư nợ và trạng thái
    pub async fn update_state<'e, E: SqliteExecutor<'e>>(
        exec: E,
        loan: &Loan,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE loans SET balance = ?, status = ?, paid_at = ?, cancel_reason = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(loan.balance.to_string())
        .bind(loan.status.as_str())
        .bind(loan.paid_at)
        .bind(&loan.cancel_reason)
        .bind(loan.updated_at)
        .bind(loan.id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Loan", &loan.code));
        }
        Ok(())
    }

    /// Ghi các trường không liên quan tới tiền. Dư nợ, số tiền vay và lãi
    /// suất không bị đụng tới.
    pub async fn update_details<'e, E: SqliteExecutor<'e>>(
        exec: E,
        loan: &Loan,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE loans SET codebtor_id = ?, interest_timing = ?, due_date = ?, term_months = ?,
                              note_photo = ?, note_photo_back = ?, notes = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(loan.codebtor_id)
        .bind(loan.interest_timing.as_str())
        .bind(loan.due_date)
        .bind(loan.term_months.map(i64::from))
        .bind(&loan.note_photo)
        .bind(&loan.note_photo_back)
        .bind(&loan.notes)
        .bind(loan.updated_at)
        .bind(loan.id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Loan", &loan.code));
        }
        Ok(())
    }

    /// Danh sách khoản vay, mới nhất trước
    pub async fn list<'e, E: SqliteExecutor<'e>>(
        exec: E,
        query: &LoanQuery,
    ) -> PersistenceResult<Vec<Loan>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT l.* FROM loans l JOIN clients c ON c.id = l.client_id WHERE 1 = 1",
        );

        if let Some(pattern) = like_pattern(query.search.as_deref()) {
            qb.push(" AND (l.code LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.first_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.last_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR (c.first_name || ' ' || c.last_name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.national_id LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(ref lender) = query.lender_code {
            qb.push(" AND l.lender_code = ").push_bind(lender.clone());
        }
        if let Some(client_id) = query.client_id {
            qb.push(" AND l.client_id = ").push_bind(client_id);
        }
        if let Some(status) = query.status {
            qb.push(" AND l.status = ").push_bind(status.as_str());
        }
        if let Some(from) = query.started_from {
            qb.push(" AND l.start_date >= ").push_bind(from);
        }
        if let Some(to) = query.started_to {
            qb.push(" AND l.start_date <= ").push_bind(to);
        }
        qb.push(" ORDER BY l.start_date DESC, l.id DESC");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb.build_query_as::<LoanRow>().fetch_all(exec).await?;
        rows.into_iter().map(Loan::try_from).collect()
    }
}

// ============================================================================
// Payment Repository
// ============================================================================

/// Điều kiện lọc thanh toán
#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
    /// Tìm trong số biên nhận, mã khoản vay, tên client
    pub search: Option<String>,
    pub loan_id: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_voided: bool,
    pub limit: Option<u32>,
}

impl PaymentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: &str) -> Self {
        self.search = Some(term.to_string());
        self
    }

    pub fn loan(mut self, loan_id: i64) -> Self {
        self.loan_id = Some(loan_id);
        self
    }

    pub fn method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn on(self, date: NaiveDate) -> Self {
        self.between(date, date)
    }

    pub fn with_voided(mut self) -> Self {
        self.include_voided = true;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Repository cho payments table
pub struct PaymentRepo;

impl PaymentRepo {
    /// Lấy payment theo số biên nhận
    pub async fn get_by_receipt<'e, E: SqliteExecutor<'e>>(
        exec: E,
        receipt: &str,
    ) -> PersistenceResult<Payment> {
        let row = sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE receipt = ?")
            .bind(receipt)
            .fetch_optional(exec)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Payment", receipt))?;
        Payment::try_from(row)
    }

    /// Tất cả payments của một khoản vay (kể cả đã hủy), cũ nhất trước
    pub async fn list_for_loan<'e, E: SqliteExecutor<'e>>(
        exec: E,
        loan_id: i64,
    ) -> PersistenceResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT * FROM payments WHERE loan_id = ? ORDER BY date, id",
        )
        .bind(loan_id)
        .fetch_all(exec)
        .await?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    /// Thêm payment mới, trả về ID
    pub async fn insert<'e, E: SqliteExecutor<'e>>(
        exec: E,
        payment: &Payment,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO payments (receipt, loan_id, total, interest, principal, kind, method, date,
                                   reference, notes, receipt_scan, receipt_printed, voided, voided_at,
                                   void_reason, voided_by, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payment.receipt)
        .bind(payment.loan_id)
        .bind(payment.total.to_string())
        .bind(payment.interest.to_string())
        .bind(payment.principal.to_string())
        .bind(payment.kind.as_str())
        .bind(payment.method.as_str())
        .bind(payment.date)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(&payment.receipt_scan)
        .bind(payment.receipt_printed)
        .bind(payment.voided)
        .bind(payment.voided_at)
        .bind(&payment.void_reason)
        .bind(&payment.voided_by)
        .bind(&payment.created_by)
        .bind(payment.created_at)
        .execute(exec)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Ghi thông tin hủy
    pub async fn update_void<'e, E: SqliteExecutor<'e>>(
        exec: E,
        payment: &Payment,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE payments SET voided = ?, voided_at = ?, void_reason = ?, voided_by = ? WHERE id = ?",
        )
        .bind(payment.voided)
        .bind(payment.voided_at)
        .bind(&payment.void_reason)
        .bind(&payment.voided_by)
        .bind(payment.id)
        .execute(exec)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Payment", &payment.receipt));
        }
        Ok(())
    }

    /// Đánh dấu đã in biên nhận
    pub async fn set_receipt_printed<'e, E: SqliteExecutor<'e>>(
        exec: E,
        receipt: &str,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE payments SET receipt_printed = 1 WHERE receipt = ?")
            .bind(receipt)
            .execute(exec)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Payment", receipt));
        }
        Ok(())
    }

    /// Danh sách payments, mới nhất trước
    pub async fn list<'e, E: SqliteExecutor<'e>>(
        exec: E,
        query: &PaymentQuery,
    ) -> PersistenceResult<Vec<Payment>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT p.* FROM payments p
             JOIN loans l ON l.id = p.loan_id
             JOIN clients c ON c.id = l.client_id
             WHERE 1 = 1",
        );

        if let Some(pattern) = like_pattern(query.search.as_deref()) {
            qb.push(" AND (p.receipt LIKE ")
                .push_bind(pattern.clone())
                .push(" OR l.code LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.first_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.last_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR (c.first_name || ' ' || c.last_name) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(loan_id) = query.loan_id {
            qb.push(" AND p.loan_id = ").push_bind(loan_id);
        }
        if let Some(method) = query.method {
            qb.push(" AND p.method = ").push_bind(method.as_str());
        }
        if let Some(from) = query.from {
            qb.push(" AND p.date >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            qb.push(" AND p.date <= ").push_bind(to);
        }
        if !query.include_voided {
            qb.push(" AND p.voided = 0");
        }
        qb.push(" ORDER BY p.date DESC, p.id DESC");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb.build_query_as::<PaymentRow>().fetch_all(exec).await?;
        rows.into_iter().map(Payment::try_from).collect()
    }
}

// ============================================================================
// Database Initialization
// ============================================================================

fn connect_options(database_url: &str) -> PersistenceResult<SqliteConnectOptions> {
    Ok(database_url
        .parse::<SqliteConnectOptions>()?
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT))
}

/// Tạo connection pool tới database có sẵn
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = SqlitePool::connect_with(connect_options(database_url)?).await?;
    Ok(pool)
}

/// Chạy migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Tạo database mới với schema
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    // Tạo file nếu chưa có
    let pool = SqlitePool::connect_with(connect_options(database_url)?.create_if_missing(true)).await?;

    run_migrations(&pool).await?;
    info!(database_url, "Database ready");

    Ok(pool)
}

/// Database trong bộ nhớ, một connection duy nhất (dùng cho test)
pub async fn create_memory_pool() -> PersistenceResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_options("sqlite::memory:")?)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}
