use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use mentora_shared::errors::{AppError, AppResult, ErrorCode};
use mentora_shared::types::auth::AccountRole;

use crate::models::{Account, NewAccount};
use crate::schema::{accounts, availability_slots, majors, payments, sessions};

pub fn find_account(conn: &mut PgConnection, account_id: Uuid) -> AppResult<Option<Account>> {
    Ok(accounts::table
        .filter(accounts::id.eq(account_id))
        .filter(accounts::deleted_at.is_null())
        .select(Account::as_select())
        .first(conn)
        .optional()?)
}

pub fn find_by_email(conn: &mut PgConnection, email: &str) -> AppResult<Option<Account>> {
    Ok(accounts::table
        .filter(accounts::email.eq(email.to_lowercase()))
        .filter(accounts::deleted_at.is_null())
        .select(Account::as_select())
        .first(conn)
        .optional()?)
}

pub fn find_mentor(conn: &mut PgConnection, mentor_id: Uuid) -> AppResult<Account> {
    find_account(conn, mentor_id)?
        .filter(|a| a.role() == AccountRole::Mentor)
        .ok_or_else(|| AppError::new(ErrorCode::MentorNotFound, "mentor not found"))
}

/// Inserts a new account after checking the major exists and the email is
/// not taken by a live account.
pub fn register(conn: &mut PgConnection, new_account: NewAccount) -> AppResult<Account> {
    conn.transaction(|conn| {
        if let Some(major_id) = new_account.major_id {
            let exists: i64 = majors::table
                .filter(majors::id.eq(major_id))
                .count()
                .get_result(conn)?;
            if exists == 0 {
                return Err(AppError::new(ErrorCode::MajorNotFound, "major not found"));
            }
        }

        if find_by_email(conn, &new_account.email)?.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }

        let account = diesel::insert_into(accounts::table)
            .values(&new_account)
            .returning(Account::as_returning())
            .get_result(conn)?;
        Ok(account)
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    pub sessions_deleted: usize,
    pub slots_released: usize,
}

/// Soft-deletes the account and removes every session it took part in,
/// with their payments. Slots held by a deleted session are freed; a
/// mentor's own slots are removed.
pub fn delete_account(conn: &mut PgConnection, account: &Account) -> AppResult<DeletionSummary> {
    conn.transaction(|conn| {
        let owned: Vec<(Uuid, Option<Uuid>)> = sessions::table
            .filter(sessions::mentor_id.eq(account.id).or(sessions::mentee_id.eq(account.id)))
            .select((sessions::id, sessions::slot_id))
            .load(conn)?;
        let session_ids: Vec<Uuid> = owned.iter().map(|(id, _)| *id).collect();
        let held_slots: Vec<Uuid> = owned.iter().filter_map(|(_, slot)| *slot).collect();

        let slots_released = diesel::update(
            availability_slots::table.filter(availability_slots::id.eq_any(&held_slots)),
        )
        .set(availability_slots::is_booked.eq(false))
        .execute(conn)?;

        diesel::delete(payments::table.filter(payments::session_id.eq_any(&session_ids)))
            .execute(conn)?;
        let sessions_deleted =
            diesel::delete(sessions::table.filter(sessions::id.eq_any(&session_ids)))
                .execute(conn)?;

        if account.role() == AccountRole::Mentor {
            let owned_slots = availability_slots::mentor_id.eq(account.id);
            diesel::delete(availability_slots::table.filter(owned_slots)).execute(conn)?;
        }

        let now = Utc::now();
        diesel::update(accounts::table.find(account.id))
            .set((accounts::deleted_at.eq(Some(now)), accounts::updated_at.eq(now)))
            .execute(conn)?;

        Ok::<_, AppError>(DeletionSummary { sessions_deleted, slots_released })
    })
}
