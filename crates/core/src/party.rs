//! # Party Module
//!
//! Các bên tham gia khoản vay:
//! - Lender (prestamista): người cho vay, có mã PRE001...
//! - Client (cliente): người vay, định danh bằng số căn cước
//! - CoDebtor (co-deudor): người bảo lãnh, thuộc về một client

use crate::error::{CoreError, CoreResult};
use crate::money::ensure_rate;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

fn require(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Người cho vay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lender {
    /// Mã người cho vay (PRE001, PRE002, ...), gán một lần
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    /// Lãi suất mặc định (%/tháng) cho khoản vay mới
    pub default_rate: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Lender {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for Lender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.full_name())
    }
}

/// Dữ liệu tạo người cho vay (mã do hệ thống cấp)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLender {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub default_rate: Decimal,
}

impl NewLender {
    pub fn validate(&self) -> CoreResult<()> {
        require("First name", &self.first_name)?;
        require("Last name", &self.last_name)?;
        require("National id", &self.national_id)?;
        ensure_rate(self.default_rate)
    }
}

/// Người vay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Số căn cước, duy nhất trong toàn hệ thống
    pub national_id: String,
    pub primary_address: String,
    pub secondary_address: String,
    pub phone: String,
    pub alternate_phone: String,
    pub email: String,
    pub notes: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.full_name(), self.national_id)
    }
}

/// Dữ liệu tạo/cập nhật client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientDetails {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub primary_address: String,
    #[serde(default)]
    pub secondary_address: String,
    pub phone: String,
    #[serde(default)]
    pub alternate_phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub notes: String,
}

impl ClientDetails {
    pub fn validate(&self) -> CoreResult<()> {
        require("First name", &self.first_name)?;
        require("Last name", &self.last_name)?;
        require("National id", &self.national_id)?;
        require("Primary address", &self.primary_address)?;
        require("Phone", &self.phone)?;
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(CoreError::validation(format!("Invalid email: {}", self.email)));
        }
        Ok(())
    }
}

/// Người bảo lãnh (co-debtor) của một client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoDebtor {
    pub id: i64,
    pub client_id: i64,
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub address: String,
    /// Quan hệ với client (vợ/chồng, anh em, ...)
    pub relationship: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for CoDebtor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name, self.relationship)
    }
}

/// Dữ liệu thêm co-debtor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoDebtor {
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
    pub address: String,
    pub relationship: String,
}

impl NewCoDebtor {
    pub fn validate(&self) -> CoreResult<()> {
        require("Full name", &self.full_name)?;
        require("National id", &self.national_id)?;
        require("Phone", &self.phone)?;
        require("Address", &self.address)?;
        require("Relationship", &self.relationship)
    }
}
