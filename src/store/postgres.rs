use crate::domain::account::{AccountType, GatewayAccount, PaymentProvider};
use crate::domain::charge::{CardDetailsSnapshot, Charge, ChargeStatus};
use crate::domain::event::{ChargeEvent, RefundEvent};
use crate::domain::refund::{Refund, RefundStatus};
use crate::store::{ConnectorStore, NewCharge, NewRefund, TransitionOutcome};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

fn charge_from_row(row: &PgRow) -> Result<Charge> {
    let status: String = row.get("status");
    let status = ChargeStatus::from_str(&status)
        .ok_or_else(|| anyhow!("unknown charge status in database: {}", status))?;

    let last_four: Option<String> = row.get("last_four_digits");
    let card_details = last_four.map(|last_four_digits| CardDetailsSnapshot {
        cardholder_name: row.get::<Option<String>, _>("cardholder_name").unwrap_or_default(),
        last_four_digits,
        first_six_digits: row.get::<Option<String>, _>("first_six_digits").unwrap_or_default(),
        expiry_date: row.get::<Option<String>, _>("expiry_date").unwrap_or_default(),
        card_brand: row.get::<Option<String>, _>("card_brand").unwrap_or_default(),
    });

    Ok(Charge {
        id: row.get("id"),
        external_id: row.get("external_id"),
        gateway_account_id: row.get("gateway_account_id"),
        amount: row.get("amount"),
        status,
        gateway_transaction_id: row.get("gateway_transaction_id"),
        provider_session_id: row.get("provider_session_id"),
        return_url: row.get("return_url"),
        reference: row.get("reference"),
        description: row.get("description"),
        email: row.get("email"),
        card_details,
        created_date: row.get("created_date"),
    })
}

fn refund_from_row(row: &PgRow) -> Result<Refund> {
    let status: String = row.get("status");
    let status = RefundStatus::from_str(&status)
        .ok_or_else(|| anyhow!("unknown refund status in database: {}", status))?;

    Ok(Refund {
        id: row.get("id"),
        external_id: row.get("external_id"),
        charge_id: row.get("charge_id"),
        amount: row.get("amount"),
        status,
        gateway_transaction_id: row.get("gateway_transaction_id"),
        user_external_id: row.get("user_external_id"),
        created_date: row.get("created_date"),
    })
}

const CHARGE_COLUMNS: &str = "id, external_id, gateway_account_id, amount, status, \
     gateway_transaction_id, provider_session_id, return_url, reference, description, email, \
     cardholder_name, last_four_digits, first_six_digits, expiry_date, card_brand, created_date";

const REFUND_COLUMNS: &str =
    "id, external_id, charge_id, amount, status, gateway_transaction_id, user_external_id, created_date";

fn status_strings(statuses: &[ChargeStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait::async_trait]
impl ConnectorStore for PgStore {
    async fn insert_charge(&self, new: NewCharge) -> Result<Charge> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO charges (external_id, gateway_account_id, amount, status, return_url, reference, description, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CHARGE_COLUMNS}
            "#,
        ))
        .bind(&new.external_id)
        .bind(new.gateway_account_id)
        .bind(new.amount)
        .bind(ChargeStatus::Created.as_str())
        .bind(&new.return_url)
        .bind(&new.reference)
        .bind(&new.description)
        .bind(&new.email)
        .fetch_one(&self.pool)
        .await?;

        charge_from_row(&row)
    }

    async fn find_charge_by_external_id(&self, external_id: &str) -> Result<Option<Charge>> {
        let row = sqlx::query(&format!(
            "SELECT {CHARGE_COLUMNS} FROM charges WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(charge_from_row).transpose()
    }

    async fn find_charge_by_id(&self, id: i64) -> Result<Option<Charge>> {
        let row = sqlx::query(&format!("SELECT {CHARGE_COLUMNS} FROM charges WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(charge_from_row).transpose()
    }

    async fn find_charge_by_gateway_transaction_id(
        &self,
        provider: PaymentProvider,
        transaction_id: &str,
    ) -> Result<Option<Charge>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM charges c
            JOIN gateway_accounts a ON a.id = c.gateway_account_id
            WHERE a.payment_provider = $1 AND c.gateway_transaction_id = $2
            "#,
            CHARGE_COLUMNS
                .split(", ")
                .map(|c| format!("c.{c}"))
                .collect::<Vec<_>>()
                .join(", "),
        ))
        .bind(provider.as_str())
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(charge_from_row).transpose()
    }

    /// The conditional update of every charge status write. One atomic
    /// statement; the `status = ANY(...)` predicate is what turns a
    /// concurrent-writer race into a zero-row no-op for the loser.
    async fn transition_charge_status(
        &self,
        charge_id: i64,
        expected: &[ChargeStatus],
        to: ChargeStatus,
    ) -> Result<TransitionOutcome> {
        let result = sqlx::query(
            "UPDATE charges SET status = $1, updated_date = now() WHERE id = $2 AND status = ANY($3)",
        )
        .bind(to.as_str())
        .bind(charge_id)
        .bind(status_strings(expected))
        .execute(&self.pool)
        .await?;

        let rows = result.rows_affected();
        Ok(if rows > 0 {
            TransitionOutcome::applied(rows)
        } else {
            TransitionOutcome::lost_race()
        })
    }

    async fn set_charge_transaction_id(
        &self,
        charge_id: i64,
        transaction_id: &str,
        provider_session_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE charges SET gateway_transaction_id = $2, provider_session_id = COALESCE($3, provider_session_id) WHERE id = $1",
        )
        .bind(charge_id)
        .bind(transaction_id)
        .bind(provider_session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_charge_card_details(
        &self,
        charge_id: i64,
        details: &CardDetailsSnapshot,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE charges SET cardholder_name = $2, last_four_digits = $3, first_six_digits = $4,
                   expiry_date = $5, card_brand = $6
            WHERE id = $1
            "#,
        )
        .bind(charge_id)
        .bind(&details.cardholder_name)
        .bind(&details.last_four_digits)
        .bind(&details.first_six_digits)
        .bind(&details.expiry_date)
        .bind(&details.card_brand)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn charges_ready_for_capture(
        &self,
        retry_delay: Duration,
        limit: i64,
    ) -> Result<Vec<Charge>> {
        let retried_before = Utc::now() - retry_delay;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CHARGE_COLUMNS} FROM charges c
            WHERE c.status = 'CAPTURE_APPROVED'
               OR (c.status = 'CAPTURE_APPROVED_RETRY' AND NOT EXISTS (
                      SELECT 1 FROM charge_events e
                      WHERE e.charge_id = c.id
                        AND e.status = 'CAPTURE_APPROVED_RETRY'
                        AND e.updated > $1))
            ORDER BY c.id ASC
            LIMIT $2
            "#,
        ))
        .bind(retried_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(charge_from_row).collect()
    }

    async fn charges_for_expiry(
        &self,
        statuses: &[ChargeStatus],
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Charge>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CHARGE_COLUMNS} FROM charges
            WHERE status = ANY($1) AND created_date < $2
            ORDER BY id ASC
            LIMIT $3
            "#,
        ))
        .bind(status_strings(statuses))
        .bind(created_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(charge_from_row).collect()
    }

    async fn record_charge_event(
        &self,
        charge_id: i64,
        status: ChargeStatus,
        gateway_event_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO charge_events (charge_id, status, gateway_event_time) VALUES ($1, $2, $3)",
        )
        .bind(charge_id)
        .bind(status.as_str())
        .bind(gateway_event_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn charge_events(&self, charge_id: i64) -> Result<Vec<ChargeEvent>> {
        let rows = sqlx::query(
            "SELECT id, charge_id, status, gateway_event_time, updated FROM charge_events WHERE charge_id = $1 ORDER BY id ASC",
        )
        .bind(charge_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status: String = row.get("status");
                let status = ChargeStatus::from_str(&status)
                    .ok_or_else(|| anyhow!("unknown charge status in event log: {}", status))?;
                Ok(ChargeEvent {
                    id: row.get("id"),
                    charge_id: row.get("charge_id"),
                    status,
                    gateway_event_time: row.get("gateway_event_time"),
                    updated: row.get("updated"),
                })
            })
            .collect()
    }

    async fn count_charge_events(&self, charge_id: i64, status: ChargeStatus) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM charge_events WHERE charge_id = $1 AND status = $2",
        )
        .bind(charge_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    async fn insert_refund(&self, new: NewRefund) -> Result<Refund> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO refunds (external_id, charge_id, amount, status, user_external_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REFUND_COLUMNS}
            "#,
        ))
        .bind(&new.external_id)
        .bind(new.charge_id)
        .bind(new.amount)
        .bind(RefundStatus::Created.as_str())
        .bind(&new.user_external_id)
        .fetch_one(&self.pool)
        .await?;

        refund_from_row(&row)
    }

    async fn find_refund_by_external_id(&self, external_id: &str) -> Result<Option<Refund>> {
        let row = sqlx::query(&format!(
            "SELECT {REFUND_COLUMNS} FROM refunds WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(refund_from_row).transpose()
    }

    async fn find_refund_by_id(&self, id: i64) -> Result<Option<Refund>> {
        let row = sqlx::query(&format!("SELECT {REFUND_COLUMNS} FROM refunds WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(refund_from_row).transpose()
    }

    async fn find_refund_by_gateway_reference(
        &self,
        provider: PaymentProvider,
        reference: &str,
    ) -> Result<Option<Refund>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM refunds r
            JOIN charges c ON c.id = r.charge_id
            JOIN gateway_accounts a ON a.id = c.gateway_account_id
            WHERE a.payment_provider = $1 AND r.gateway_transaction_id = $2
            "#,
            REFUND_COLUMNS
                .split(", ")
                .map(|c| format!("r.{c}"))
                .collect::<Vec<_>>()
                .join(", "),
        ))
        .bind(provider.as_str())
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(refund_from_row).transpose()
    }

    async fn refunds_for_charge(&self, charge_id: i64) -> Result<Vec<Refund>> {
        let rows = sqlx::query(&format!(
            "SELECT {REFUND_COLUMNS} FROM refunds WHERE charge_id = $1 ORDER BY id ASC"
        ))
        .bind(charge_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(refund_from_row).collect()
    }

    async fn transition_refund_status(
        &self,
        refund_id: i64,
        expected: &[RefundStatus],
        to: RefundStatus,
    ) -> Result<TransitionOutcome> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
        let result =
            sqlx::query("UPDATE refunds SET status = $1 WHERE id = $2 AND status = ANY($3)")
                .bind(to.as_str())
                .bind(refund_id)
                .bind(expected)
                .execute(&self.pool)
                .await?;

        let rows = result.rows_affected();
        Ok(if rows > 0 {
            TransitionOutcome::applied(rows)
        } else {
            TransitionOutcome::lost_race()
        })
    }

    async fn set_refund_gateway_reference(&self, refund_id: i64, reference: &str) -> Result<()> {
        sqlx::query("UPDATE refunds SET gateway_transaction_id = $2 WHERE id = $1")
            .bind(refund_id)
            .bind(reference)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn refunds_ready_for_submission(&self, limit: i64) -> Result<Vec<Refund>> {
        let rows = sqlx::query(&format!(
            "SELECT {REFUND_COLUMNS} FROM refunds WHERE status = 'CREATED' ORDER BY id ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(refund_from_row).collect()
    }

    async fn record_refund_event(
        &self,
        refund_id: i64,
        status: RefundStatus,
        gateway_event_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO refund_events (refund_id, status, gateway_event_time) VALUES ($1, $2, $3)",
        )
        .bind(refund_id)
        .bind(status.as_str())
        .bind(gateway_event_time)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn refund_events(&self, refund_id: i64) -> Result<Vec<RefundEvent>> {
        let rows = sqlx::query(
            "SELECT id, refund_id, status, gateway_event_time, updated FROM refund_events WHERE refund_id = $1 ORDER BY id ASC",
        )
        .bind(refund_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let status: String = row.get("status");
                let status = RefundStatus::from_str(&status)
                    .ok_or_else(|| anyhow!("unknown refund status in event log: {}", status))?;
                Ok(RefundEvent {
                    id: row.get("id"),
                    refund_id: row.get("refund_id"),
                    status,
                    gateway_event_time: row.get("gateway_event_time"),
                    updated: row.get("updated"),
                })
            })
            .collect()
    }

    async fn count_refund_events(&self, refund_id: i64, status: RefundStatus) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM refund_events WHERE refund_id = $1 AND status = $2",
        )
        .bind(refund_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    async fn insert_account(&self, account: GatewayAccount) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO gateway_accounts (id, payment_provider, account_type, service_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(account.id)
        .bind(account.payment_provider.as_str())
        .bind(match account.account_type {
            AccountType::Test => "test",
            AccountType::Live => "live",
        })
        .bind(&account.service_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_account(&self, id: i64) -> Result<Option<GatewayAccount>> {
        let row = sqlx::query(
            "SELECT id, payment_provider, account_type, service_name FROM gateway_accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let provider: String = row.get("payment_provider");
            let provider = PaymentProvider::from_str(&provider)
                .ok_or_else(|| anyhow!("unknown payment provider in database: {}", provider))?;
            let account_type: String = row.get("account_type");
            Ok(GatewayAccount {
                id: row.get("id"),
                payment_provider: provider,
                account_type: if account_type == "live" {
                    AccountType::Live
                } else {
                    AccountType::Test
                },
                service_name: row.get("service_name"),
            })
        })
        .transpose()
    }
}
