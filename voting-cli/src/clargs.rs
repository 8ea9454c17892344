//! Command-line surface: a top-level `Clargs` with a
//! `#[command(subcommand)]` split.

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
pub struct Clargs {
    /// Directory holding the JSON-file-per-collection store. Created if
    /// it doesn't already exist.
    #[arg(long, env = "VOTING_DATA_DIR", default_value = "./voting-cli-data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub subcommand: Subcommands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommands {
    /// Creates a demo election (one constituency's worth of candidates,
    /// a handful of parties) and prints the custodian shares. The
    /// shares are shown once; this program does not persist them.
    SeedElection {
        #[arg(long, default_value = "Demo Election")]
        name: String,
        #[arg(long, default_value_t = 2)]
        pr_seats: u64,
    },

    /// Registers a demo elector against the built-in citizen roster.
    Register {
        #[arg(long)]
        citizenship_number: String,
        #[arg(long)]
        full_name: String,
        /// `YYYY-MM-DD`.
        #[arg(long)]
        date_of_birth: String,
        #[arg(long)]
        password: String,
    },

    /// Logs an elector in, confirming the stored password hash matches.
    Login {
        #[arg(long)]
        elector_id: String,
        #[arg(long)]
        password: String,
    },

    /// Issues an anonymous voting token for an elector in an election.
    IssueToken {
        #[arg(long)]
        elector_id: String,
        #[arg(long)]
        election_id: String,
    },

    /// Casts a dual FPTP+PR ballot using a previously issued token.
    CastBallot {
        #[arg(long)]
        elector_id: String,
        #[arg(long)]
        election_id: String,
        #[arg(long)]
        candidate_id: String,
        #[arg(long)]
        party_id: String,
        #[arg(long)]
        token_id: String,
    },

    /// Re-verifies a previously issued cast receipt.
    VerifyReceipt {
        #[arg(long)]
        receipt_id: String,
    },

    /// Walks the audit hash chain end-to-end and reports whether it is intact.
    VerifyAudit,

    /// Ends an election's voting window immediately.
    TerminateElection {
        #[arg(long)]
        election_id: String,
    },

    /// Decrypts and tallies an election given a quorum of custodian
    /// shares (`SHARE-<index>: <hex>` strings, as printed by `seed-election`).
    Tally {
        #[arg(long)]
        election_id: String,
        #[arg(long = "share", num_args = 1..)]
        shares: Vec<String>,
    },
}
