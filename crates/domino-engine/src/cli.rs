//! Operator subcommands for the `domino` binary.
//!
//! User-facing output uses writeln! to the supplied writer (stdout in the
//! binary), not debug output.

use std::io::Write;

use rust_decimal::Decimal;

use domino_core::schedule::parse_amount;

use crate::commission::{AwardPlan, CommissionEngine, PayoutLedger};
use crate::storage::{Commission, CommissionFilter, CommissionStatus, Database, DepositStatus};

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Manage users and referral links.
    #[command(subcommand)]
    User(UserAction),
    /// Record and approve deposits.
    #[command(subcommand)]
    Deposit(DepositAction),
    /// Show a user's referral chain and what each level would earn.
    Chain {
        user_id: String,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Show a user's qualification standing.
    Qualify { user_id: String },
    /// Re-run the award for an approved deposit (safe to repeat).
    Award {
        user_id: String,
        deposit_id: String,
    },
    /// Inspect and settle commissions.
    #[command(subcommand)]
    Commissions(CommissionAction),
}

#[derive(clap::Subcommand, Debug)]
pub enum UserAction {
    /// Register a user, optionally under a referrer.
    Add {
        user_id: String,
        #[arg(long)]
        referrer: Option<String>,
    },
    /// List the users a referrer invited directly.
    Referrals { user_id: String },
}

#[derive(clap::Subcommand, Debug)]
pub enum DepositAction {
    /// Record a pending deposit.
    Add {
        deposit_id: String,
        user_id: String,
        amount: String,
    },
    /// Approve a pending deposit and award referral commissions.
    Approve { deposit_id: String },
    /// Mark a pending deposit as failed.
    Fail { deposit_id: String },
    /// List a user's deposits.
    List { user_id: String },
}

#[derive(clap::Subcommand, Debug)]
pub enum CommissionAction {
    /// List commissions.
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<CommissionStatus>,
        #[arg(long)]
        beneficiary: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Settle a pending commission as paid or rejected.
    Settle {
        commission_id: String,
        #[arg(value_parser = parse_status)]
        status: CommissionStatus,
    },
    /// Show commission totals for a beneficiary.
    Summary { user_id: String },
}

fn parse_status(s: &str) -> Result<CommissionStatus, String> {
    s.parse()
}

/// Execute a subcommand against the ledger.
pub async fn run(
    command: Command,
    engine: &CommissionEngine<Database>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::User(action) => user(action, engine.store(), out).await,
        Command::Deposit(action) => deposit(action, engine, out).await,
        Command::Chain { user_id, json } => {
            let plan = engine.plan(&user_id).await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&plan)?)?;
            } else {
                write_plan(out, &plan)?;
            }
            Ok(())
        }
        Command::Qualify { user_id } => {
            let q = engine.evaluate(&user_id).await?;
            writeln!(
                out,
                "{}: qualifies={} total_deposited={} referrer={}",
                q.user_id,
                q.qualifies,
                q.total_deposited,
                q.referrer_id.as_deref().unwrap_or("-")
            )?;
            Ok(())
        }
        Command::Award {
            user_id,
            deposit_id,
        } => {
            let rows = engine.on_deposit_approved(&user_id, &deposit_id).await?;
            write_commissions(out, &rows)
        }
        Command::Commissions(action) => commissions(action, engine.store(), out).await,
    }
}

async fn user(action: UserAction, db: &Database, out: &mut impl Write) -> anyhow::Result<()> {
    match action {
        UserAction::Add { user_id, referrer } => {
            let user = db.create_user(&user_id, referrer.as_deref()).await?;
            writeln!(
                out,
                "registered {} (referrer: {})",
                user.id,
                user.referrer_id.as_deref().unwrap_or("-")
            )?;
        }
        UserAction::Referrals { user_id } => {
            for edge in db.list_referrals(&user_id).await? {
                writeln!(out, "{}", edge.referred_id)?;
            }
        }
    }
    Ok(())
}

async fn deposit(
    action: DepositAction,
    engine: &CommissionEngine<Database>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let db = engine.store();
    match action {
        DepositAction::Add {
            deposit_id,
            user_id,
            amount,
        } => {
            let amount = parse_amount(&amount)?;
            let deposit = db.create_deposit(&deposit_id, &user_id, amount).await?;
            writeln!(out, "{} {} {} {}", deposit.id, deposit.user_id, deposit.amount, deposit.status)?;
        }
        DepositAction::Approve { deposit_id } => {
            let deposit = db
                .set_deposit_status(&deposit_id, DepositStatus::Approved)
                .await?;
            writeln!(out, "{} approved", deposit.id)?;
            let rows = engine
                .on_deposit_approved(&deposit.user_id, &deposit.id)
                .await?;
            write_commissions(out, &rows)?;
        }
        DepositAction::Fail { deposit_id } => {
            let deposit = db
                .set_deposit_status(&deposit_id, DepositStatus::Failed)
                .await?;
            writeln!(out, "{} failed", deposit.id)?;
        }
        DepositAction::List { user_id } => {
            for deposit in db.list_deposits(&user_id).await? {
                writeln!(out, "{} {} {}", deposit.id, deposit.amount, deposit.status)?;
            }
        }
    }
    Ok(())
}

async fn commissions(
    action: CommissionAction,
    db: &Database,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match action {
        CommissionAction::List {
            status,
            beneficiary,
            limit,
            json,
        } => {
            let rows = db
                .list_commissions(&CommissionFilter {
                    status,
                    beneficiary_user_id: beneficiary,
                    limit,
                })
                .await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&rows)?)?;
            } else {
                write_commissions(out, &rows)?;
            }
        }
        CommissionAction::Settle {
            commission_id,
            status,
        } => {
            let row = PayoutLedger::new(db.clone())
                .settle(&commission_id, status)
                .await?;
            writeln!(out, "{} {}", row.id, row.status)?;
        }
        CommissionAction::Summary { user_id } => {
            let s = PayoutLedger::new(db.clone()).summary(&user_id).await?;
            writeln!(
                out,
                "{}: pending={} paid={} rejected={} count={}",
                s.beneficiary_user_id, s.pending, s.paid, s.rejected, s.count
            )?;
        }
    }
    Ok(())
}

fn write_plan(out: &mut impl Write, plan: &AwardPlan) -> std::io::Result<()> {
    writeln!(
        out,
        "{} total={} qualifies={}",
        plan.trigger.user_id, plan.trigger.total_deposited, plan.trigger.qualifies
    )?;
    for d in &plan.levels {
        writeln!(
            out,
            "  L{} {} total={} commission={}",
            d.link.level,
            d.link.ancestor_id,
            d.ancestor.total_deposited,
            d.amount.map_or_else(|| "-".to_string(), |a: Decimal| a.to_string())
        )?;
    }
    Ok(())
}

fn write_commissions(out: &mut impl Write, rows: &[Commission]) -> anyhow::Result<()> {
    for c in rows {
        writeln!(
            out,
            "{} L{} {} {} {} event={}",
            c.id, c.level, c.beneficiary_user_id, c.amount, c.status, c.triggering_event_id
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use domino_core::CommissionSchedule;

    async fn engine() -> CommissionEngine<Database> {
        let db = Database::open_in_memory().await.unwrap();
        CommissionEngine::new(db, CommissionSchedule::default())
    }

    async fn exec(engine: &CommissionEngine<Database>, command: Command) -> String {
        let mut out = Vec::new();
        run(command, engine, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn approve_prints_awarded_commissions() {
        let engine = engine().await;
        for (user, referrer) in [("a", None), ("b", Some("a"))] {
            exec(
                &engine,
                Command::User(UserAction::Add {
                    user_id: user.into(),
                    referrer: referrer.map(Into::into),
                }),
            )
            .await;
        }
        for (dep, user) in [("d-a", "a"), ("d-b", "b")] {
            exec(
                &engine,
                Command::Deposit(DepositAction::Add {
                    deposit_id: dep.into(),
                    user_id: user.into(),
                    amount: "10".into(),
                }),
            )
            .await;
        }
        exec(
            &engine,
            Command::Deposit(DepositAction::Approve {
                deposit_id: "d-a".into(),
            }),
        )
        .await;

        let out = exec(
            &engine,
            Command::Deposit(DepositAction::Approve {
                deposit_id: "d-b".into(),
            }),
        )
        .await;

        assert!(out.starts_with("d-b approved\n"));
        assert!(out.contains("L1 a 0.50 pending event=d-b"));
    }

    #[tokio::test]
    async fn chain_json_is_parseable() {
        let engine = engine().await;
        engine.store().create_user("root", None).await.unwrap();
        engine.store().create_user("leaf", Some("root")).await.unwrap();

        let out = exec(
            &engine,
            Command::Chain {
                user_id: "leaf".into(),
                json: true,
            },
        )
        .await;

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["levels"][0]["link"]["ancestor_id"], "root");
        assert_eq!(value["levels"][0]["link"]["level"], 1);
    }

    #[test]
    fn status_parser_accepts_lowercase_names() {
        assert_eq!(parse_status("paid").unwrap(), CommissionStatus::Paid);
        assert!(parse_status("settled").is_err());
    }
}
