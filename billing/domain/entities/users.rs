use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::users;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub payout_account_no: Option<String>,
    pub payout_ifsc: Option<String>,
    pub payout_beneficiary_name: Option<String>,
    pub payout_bank_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntity {
    /// Account number and IFSC are the minimum needed to move money; the
    /// beneficiary name falls back to the profile name when absent.
    pub fn has_complete_payout_details(&self) -> bool {
        matches!(
            (&self.payout_account_no, &self.payout_ifsc),
            (Some(account), Some(ifsc)) if !account.is_empty() && !ifsc.is_empty()
        )
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub struct UpdateBeneficiaryDetails {
    pub payout_account_no: Option<String>,
    pub payout_ifsc: Option<String>,
    pub payout_beneficiary_name: Option<String>,
    pub payout_bank_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}
