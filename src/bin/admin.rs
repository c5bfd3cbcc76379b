use anyhow::anyhow;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use prediction_league::admin::{
    correct_prediction, delete_prediction, reset_all_predictions, ConfiguredAdmins,
    PredictionCorrection, ResetOptions,
};
use prediction_league::config::CONFIG;
use prediction_league::db::{raw_diesel_cxn_from_env, run_migrations};
use prediction_league::eligibility::EligibilityGate;
use prediction_league::locking::lock_overdue;
use prediction_league::models::fixtures::{Fixture, FixtureStatus};
use prediction_league::models::predictions::Prediction;
use prediction_league::models::stages::{Stage, StageKind};
use prediction_league::results::{set_result, ResultEntry};
use prediction_league::scoring::{rescore_fixture, score_fixture};
use prediction_league::utils::format_kickoff;
use prediction_league::views::group_standings::group_standings;
use prediction_league::views::leaderboard::{leaderboard_with_movement, take_snapshot};
use prediction_league::views::prediction_matrix::{CellBand, MatrixFilter, PredictionMatrix};
use prediction_league::PredictionError;
use diesel::SqliteConnection;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(author, version, about = "Administrative tasks for the prediction league")]
struct Args {
    /// identity id to act as; must be listed in ADMIN_USER_IDS for writes
    #[arg(long = "as")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Live,
    Finished,
}

impl From<StatusArg> for FixtureStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Live => FixtureStatus::Live,
            StatusArg::Finished => FixtureStatus::Finished,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enter a live or final result; finished results are scored immediately
    SetResult {
        #[arg(long)]
        fixture: i32,
        #[arg(long, value_enum)]
        status: StatusArg,
        #[arg(long)]
        home: Option<i32>,
        #[arg(long)]
        away: Option<i32>,
        #[arg(long, requires = "pen_away")]
        pen_home: Option<i32>,
        #[arg(long, requires = "pen_home")]
        pen_away: Option<i32>,
    },
    Score {
        #[arg(long)]
        fixture: i32,
    },
    Rescore {
        #[arg(long)]
        fixture: i32,
    },
    Correct {
        #[arg(long)]
        prediction: i32,
        #[arg(long)]
        home: Option<i32>,
        #[arg(long)]
        away: Option<i32>,
        #[arg(long)]
        points: Option<i32>,
        #[arg(long)]
        locked: Option<bool>,
    },
    DeletePrediction {
        #[arg(long)]
        prediction: i32,
    },
    /// Lock predictions for everything kicking off within the window
    Sweep {
        #[arg(long)]
        window_minutes: Option<i64>,
    },
    Snapshot {
        /// stage slug to tag the snapshot with
        #[arg(long)]
        stage: Option<String>,
    },
    Leaderboard,
    Standings {
        #[arg(long)]
        group: String,
    },
    Matrix {
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        finished_only: bool,
    },
    /// List a user's predictions in kickoff order
    Predictions {
        #[arg(long)]
        user: String,
    },
    /// Show a user's progress through the gated stage
    Gate {
        #[arg(long)]
        user: String,
    },
    /// Delete every prediction and zero every total
    Reset {
        #[arg(long)]
        confirm: String,
        #[arg(long)]
        fixtures: bool,
        #[arg(long)]
        snapshots: bool,
    },
}

fn stage_id(slug: Option<&str>, conn: &mut SqliteConnection) -> anyhow::Result<Option<i32>> {
    let Some(slug) = slug else {
        return Ok(None);
    };
    let kind = StageKind::from_slug(slug).ok_or(anyhow!("Unknown stage {slug}"))?;
    let stage = Stage::get_by_kind(kind, conn)?.ok_or(anyhow!("Stage {slug} is not seeded"))?;
    Ok(Some(stage.id))
}

fn band_char(band: CellBand) -> char {
    match band {
        CellBand::Exact => '3',
        CellBand::Outcome => '1',
        CellBand::Wrong => '0',
        CellBand::Pending => '?',
        CellBand::Absent => '.',
    }
}

fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    match run(args) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<PredictionError>() {
            // a refused request, not a broken database
            Some(pe) if pe.is_expected() => {
                eprintln!("{pe}");
                Ok(ExitCode::FAILURE)
            }
            _ => Err(e),
        },
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut db = raw_diesel_cxn_from_env()?;
    run_migrations(&mut db)?;
    let admins = ConfiguredAdmins::new(CONFIG.admin_user_ids.clone());
    let actor = args.actor.as_str();

    match args.command {
        Command::SetResult {
            fixture,
            status,
            home,
            away,
            pen_home,
            pen_away,
        } => {
            let entry = ResultEntry {
                status: status.into(),
                home_score: home,
                away_score: away,
                penalties: pen_home.zip(pen_away),
            };
            let report = set_result(&admins, actor, fixture, &entry, &mut db)?;
            println!(
                "Fixture {} is {:?}; locked {}, scored {}",
                report.fixture.id,
                report.fixture.status(),
                report.locked,
                report.scored
            );
        }
        Command::Score { fixture } => {
            let n = score_fixture(&admins, actor, fixture, &mut db)?;
            println!("Scored {n} predictions");
        }
        Command::Rescore { fixture } => {
            let n = rescore_fixture(&admins, actor, fixture, &mut db)?;
            println!("Rescored {n} predictions");
        }
        Command::Correct {
            prediction,
            home,
            away,
            points,
            locked,
        } => {
            let correction = PredictionCorrection {
                home_score: home,
                away_score: away,
                points_earned: points,
                is_locked: locked,
            };
            let p = correct_prediction(&admins, actor, prediction, &correction, &mut db)?;
            println!("{p:?}");
        }
        Command::DeletePrediction { prediction } => {
            delete_prediction(&admins, actor, prediction, &mut db)?;
            println!("Deleted prediction {prediction}");
        }
        Command::Sweep { window_minutes } => {
            let window = Duration::minutes(window_minutes.unwrap_or(CONFIG.lock_window_minutes));
            let report = lock_overdue(Utc::now(), window, &mut db)?;
            println!(
                "{} fixtures due, {} predictions locked",
                report.fixtures, report.predictions
            );
        }
        Command::Snapshot { stage } => {
            let sid = stage_id(stage.as_deref(), &mut db)?;
            let n = take_snapshot(sid, &mut db)?;
            println!("Snapshot of {n} users saved");
        }
        Command::Leaderboard => {
            for m in leaderboard_with_movement(&mut db)? {
                let moved = match m.places_moved() {
                    None => "new".to_string(),
                    Some(0) => "=".to_string(),
                    Some(n) => format!("{n:+}"),
                };
                println!(
                    "{:>3}. {:<24} {:>4} ({moved})",
                    m.row.rank, m.row.display_name, m.row.total_points
                );
            }
        }
        Command::Standings { group } => {
            println!("Group {group}  P  W  D  L  GF GA GD Pts");
            for r in group_standings(&group, &mut db)? {
                println!(
                    "{:<20} {:>2} {:>2} {:>2} {:>2} {:>3} {:>2} {:>+3} {:>3}",
                    r.team_name,
                    r.played,
                    r.won,
                    r.drawn,
                    r.lost,
                    r.goals_for,
                    r.goals_against,
                    r.goal_difference(),
                    r.points
                );
            }
        }
        Command::Matrix {
            stage,
            finished_only,
        } => {
            let filter = MatrixFilter {
                stage_id: stage_id(stage.as_deref(), &mut db)?,
                finished_only,
            };
            let matrix = PredictionMatrix::build(&filter, &mut db)?;
            println!(
                "match  {}",
                matrix.users.iter().map(|u| u.display_name.as_str()).join(" | ")
            );
            for (fixture, cells) in matrix.rows() {
                let (home, away) = fixture.display_names(&mut db)?;
                let marks: String = cells.iter().map(|c| band_char(c.band)).collect();
                println!(
                    "{:>5}  {marks}  {home} v {away} ({})",
                    fixture.match_number,
                    format_kickoff(fixture.scheduled_at)
                );
            }
        }
        Command::Predictions { user } => {
            for p in Prediction::for_user(&user, &mut db)? {
                let fixture = Fixture::get(p.fixture_id, &mut db)?;
                let (home, away) = fixture.display_names(&mut db)?;
                let (h, a) = p.scores();
                println!(
                    "{:>5}  {home} v {away} ({})  {h}-{a}  points {}{}",
                    fixture.match_number,
                    format_kickoff(fixture.scheduled_at),
                    p.points_earned()
                        .map(|n| n.to_string())
                        .unwrap_or("-".to_string()),
                    if p.lock_flag() { "  locked" } else { "" }
                );
            }
        }
        Command::Gate { user } => {
            let kind = CONFIG
                .gated_stage
                .ok_or(anyhow!("GATED_STAGE is not configured"))?;
            let status = EligibilityGate::new(kind).status(&user, Utc::now(), &mut db)?;
            println!(
                "{user}: {}/{} predicted in {}; deadline {}; {}",
                status.completed,
                status.total,
                kind.slug(),
                status
                    .deadline
                    .map(|d| format_kickoff(d.timestamp()))
                    .unwrap_or("none".to_string()),
                if status.open { "open" } else { "closed" }
            );
        }
        Command::Reset {
            confirm,
            fixtures,
            snapshots,
        } => {
            let options = ResetOptions {
                reset_fixture_results: fixtures,
                clear_snapshots: snapshots,
            };
            let report = reset_all_predictions(
                &admins,
                actor,
                options,
                &confirm,
                CONFIG.reset_confirmation_token.as_deref(),
                &mut db,
            )?;
            println!("{report:?}");
        }
    }
    Ok(())
}
