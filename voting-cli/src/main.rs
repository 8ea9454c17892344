//! Demo binary driving one full election lifecycle against a
//! file-backed store: parse arguments, dispatch to a subcommand, run it.

mod clargs;
mod demo_data;

use anyhow::{bail, Context, Result};
use clap::Parser;
use clargs::{Clargs, Subcommands};
use voting_audit::RequestContext;
use voting_core::{CoreContext, StorageBackend, VotingCoreConfig};
use voting_shamir::Share;
use voting_util::Csprng;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let clargs = Clargs::parse();

    let config = VotingCoreConfig {
        storage_backend: StorageBackend::File {
            base_dir: clargs.data_dir.clone(),
        },
        ..VotingCoreConfig::production()
    };
    let ctx = CoreContext::new(config).context("opening the data directory")?;
    let mut csprng = Csprng::from_os_entropy();
    let now = chrono::Utc::now();

    match clargs.subcommand {
        Subcommands::SeedElection { name, pr_seats } => {
            let (election, shares) = voting_core::workflows::create_election(
                &ctx,
                &name,
                now,
                now + chrono::Duration::hours(12),
                demo_data::demo_candidates(),
                demo_data::demo_parties(),
                pr_seats,
                RequestContext::default(),
                &mut csprng,
                now,
            )
            .context("creating election")?;

            println!("election_id: {}", election.election_id);
            println!(
                "voting window: {} .. {}",
                election.start_at, election.end_at
            );
            println!(
                "custodian shares (t={}, n={}) - record these now, they are never shown again:",
                election.shamir_threshold, election.shamir_total_custodians
            );
            for share in &shares {
                println!("  {}", share.to_transcription_string());
            }
        }

        Subcommands::Register {
            citizenship_number,
            full_name,
            date_of_birth,
            password,
        } => {
            let dob = chrono::NaiveDate::parse_from_str(&date_of_birth, "%Y-%m-%d")
                .context("date of birth must be YYYY-MM-DD")?;
            let oracle = demo_data::demo_oracle();
            let elector = voting_core::workflows::register_elector(
                &ctx,
                &oracle,
                &citizenship_number,
                &full_name,
                dob,
                &password,
                RequestContext::default(),
                &mut csprng,
                now,
            )
            .context("registering elector")?;
            println!("elector_id: {}", elector.elector_id);
            println!("constituency: {}", elector.constituency);
        }

        Subcommands::Login {
            elector_id,
            password,
        } => {
            voting_core::workflows::login_elector(
                &ctx,
                &elector_id,
                &password,
                RequestContext::default(),
                now,
            )
            .context("login failed")?;
            println!("login ok");
        }

        Subcommands::IssueToken {
            elector_id,
            election_id,
        } => {
            let token = voting_core::workflows::issue_token(
                &ctx,
                &elector_id,
                &election_id,
                RequestContext::default(),
                &mut csprng,
                now,
            )
            .context("issuing token")?;
            println!("token_id: {}", token.token_id);
        }

        Subcommands::CastBallot {
            elector_id,
            election_id,
            candidate_id,
            party_id,
            token_id,
        } => {
            let receipt = voting_core::workflows::cast_ballot(
                &ctx,
                &elector_id,
                &election_id,
                &candidate_id,
                &party_id,
                &token_id,
                RequestContext::default(),
                &mut csprng,
                now,
            )
            .context("casting ballot")?;
            println!("receipt_id: {}", receipt.receipt_id);
            println!("cast_at: {}", receipt.cast_at);
        }

        Subcommands::VerifyReceipt { receipt_id } => {
            let verification = voting_core::workflows::verify_receipt(
                &ctx,
                &receipt_id,
                RequestContext::default(),
                now,
            )
            .context("verifying receipt")?;
            println!("election_id: {}", verification.election_id);
            println!("ballot kinds present: {:?}", verification.kinds_present);
            println!("cast_at: {}", verification.cast_at);
            println!("times verified (including this one): {}", verification.verification_count);
        }

        Subcommands::VerifyAudit => match voting_core::workflows::verify_audit_chain(&ctx) {
            Ok(()) => println!("audit chain intact"),
            Err(e) => bail!("audit chain check failed: {e}"),
        },

        Subcommands::TerminateElection { election_id } => {
            let election = voting_core::workflows::terminate_election(
                &ctx,
                &election_id,
                RequestContext::default(),
                now,
            )
            .context("terminating election")?;
            println!("election {} ended at {}", election.election_id, election.end_at);
        }

        Subcommands::Tally {
            election_id,
            shares,
        } => {
            let shares: Vec<Share> = shares
                .iter()
                .map(|s| Share::parse(s).with_context(|| format!("could not parse share {s:?}")))
                .collect::<Result<_>>()?;
            let result = voting_core::workflows::tally_election(
                &ctx,
                &election_id,
                &shares,
                RequestContext::default(),
                now,
            )
            .context("tallying election")?;

            println!("FPTP results:");
            for constituency in &result.fptp {
                println!("  {}: winner {}", constituency.constituency, constituency.winner);
                for (candidate_id, votes) in &constituency.counts {
                    println!("    {candidate_id}: {votes}");
                }
            }
            println!("PR seats:");
            for seat in &result.pr {
                println!("  {}: {} votes, {} seats", seat.party_id, seat.votes, seat.seats);
            }
        }
    }

    Ok(())
}
