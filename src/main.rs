//! mission-desk - command-line client for the mission assignment service
//!
//! Lists, filters and toggles missions, shows the archive, agenda and
//! statistics views, and submits the create/edit mission form.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod error;
mod filter;
mod form;
mod gateway;
mod models;
mod policy;
mod render;
mod session;
mod stats;
mod store;

use config::Config;
use error::{DeskError, DeskResult};
use filter::{AssignmentType, StatusFilter, UserSelection};
use form::MissionForm;
use gateway::{Gateway, HttpGateway};
use session::ViewSession;
use store::{MissionStore, Settlement};

#[derive(Parser)]
#[command(name = "mission-desk")]
#[command(about = "Command-line client for the mission assignment service")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dashboard: missions assigned to or by you, filtered
    List {
        /// Which side of the assignment to show
        #[arg(long, value_enum, default_value_t = AssignmentType::AssignedToMe)]
        side: AssignmentType,

        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,

        /// Text to look for in description, route or creator
        #[arg(short, long)]
        search: Option<String>,

        /// Assignee id, or "all"
        #[arg(short, long, default_value = "all")]
        user: UserSelection,

        /// Earliest start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Show one mission in detail
    Show { id: u64 },

    /// Mark a mission completed, or pending again
    Toggle { id: u64 },

    /// Completed missions, most recent first
    Archive {
        #[arg(short, long)]
        search: Option<String>,

        /// Move an archived mission back to pending
        #[arg(long)]
        restore: Option<u64>,
    },

    /// Missions running on a given day
    Agenda {
        /// Day to show (defaults to today)
        date: Option<NaiveDate>,
    },

    /// Completion statistics
    Stats {
        /// Report for one user instead of your default scope
        #[arg(short, long)]
        user: Option<u64>,
    },

    /// Create a mission
    Create {
        #[arg(short, long)]
        description: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Route, e.g. "Ankara - İstanbul"
        #[arg(long)]
        route: Option<String>,

        /// Assignee id. May be repeated.
        #[arg(short, long = "assign")]
        assign: Vec<u64>,

        /// File to attach. May be repeated.
        #[arg(long = "attach")]
        attach: Vec<PathBuf>,

        /// Drop the Nth --attach file (0-based) before uploading. May be repeated.
        #[arg(long = "detach")]
        detach: Vec<usize>,
    },

    /// Edit a mission you created
    Edit {
        id: u64,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long)]
        route: Option<String>,

        /// Add or remove an assignee. May be repeated.
        #[arg(long = "toggle-user")]
        toggle_user: Vec<u64>,

        /// File to attach. May be repeated.
        #[arg(long = "attach")]
        attach: Vec<PathBuf>,

        /// Drop the Nth --attach file (0-based) before uploading. May be repeated.
        #[arg(long = "detach")]
        detach: Vec<usize>,
    },

    /// Users you can assign missions to
    Users,

    /// Organization chart by role
    OrgChart,

    /// Your profile
    Profile,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mission_desk=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init { output } = &cli.command {
        let path = match output {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };
        Config::default().save_to(&path)?;

        println!("Created config file: {}", path.display());
        println!();
        println!("Next steps:");
        println!("  1. Set server.base_url to your mission API");
        println!("  2. Paste your access token into auth.access_token");
        println!("     (or export MISSION_DESK_TOKEN)");
        return Ok(());
    }

    let mut cfg = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_env_overrides();

    if let Some(server) = cli.server {
        cfg.server.base_url = server;
    }

    let gateway = HttpGateway::new(&cfg).context("Failed to build HTTP client")?;

    if let Err(err) = run(cli.command, &gateway).await {
        eprintln!("❌ {}", err.notice());
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, gateway: &dyn Gateway) -> DeskResult<()> {
    match command {
        Commands::Init { .. } => Ok(()),

        Commands::List {
            side,
            status,
            search,
            user,
            from,
            to,
        } => {
            let Some(store) = load_store(gateway).await? else {
                return Ok(());
            };

            let mut session = ViewSession::starting_today(None);
            session.switch_assignment(side);
            session.criteria.status = status;
            session.criteria.search = search.unwrap_or_default();
            session.criteria.selected_user = user;
            session.criteria.date_from = from;
            session.criteria.date_to = to;

            let title = match side {
                AssignmentType::AssignedToMe => "📥 Assigned to me",
                AssignmentType::AssignedByMe => "📤 Assigned by me",
            };
            render::print_snapshot(title, &session.visible_stats(store.missions()));
            println!();
            render::print_missions("Missions", &session.visible(store.missions()), session.today);

            let hidden = session.hidden_by_filters(store.missions());
            if hidden > 0 {
                println!("  ({hidden} more hidden by filters)");
            }
            Ok(())
        }

        Commands::Show { id } => {
            let mission = gateway.get_mission(id).await?;
            render::print_mission(&mission, ViewSession::starting_today(None).today);
            Ok(())
        }

        Commands::Toggle { id } => toggle(gateway, id, None).await,

        Commands::Archive { search, restore } => {
            if let Some(id) = restore {
                return toggle(gateway, id, Some(true)).await;
            }

            let Some(store) = load_store(gateway).await? else {
                return Ok(());
            };
            let today = ViewSession::starting_today(None).today;
            let archived = filter::archive(store.missions(), search.as_deref().unwrap_or(""));
            render::print_missions("🗄️  Archive", &archived, today);
            Ok(())
        }

        Commands::Agenda { date } => {
            let Some(store) = load_store(gateway).await? else {
                return Ok(());
            };
            let today = ViewSession::starting_today(None).today;
            let day = date.unwrap_or(today);
            let active = filter::active_on(store.missions(), day);
            render::print_missions(&format!("📅 {}", day.format("%d.%m.%Y")), &active, today);
            Ok(())
        }

        Commands::Stats { user } => statistics(gateway, user).await,

        Commands::Create {
            description,
            start,
            end,
            route,
            assign,
            attach,
            detach,
        } => {
            let mut form = MissionForm::create();
            form.draft.description = description;
            form.draft.assigned_date = Some(start);
            form.draft.end_date = Some(end);
            form.draft.from_to = route.unwrap_or_default();
            for user_id in assign {
                form.draft.toggle_user(user_id);
            }

            submit_form(form, attach, detach, gateway).await
        }

        Commands::Edit {
            id,
            description,
            start,
            end,
            route,
            toggle_user,
            attach,
            detach,
        } => {
            let mission = gateway.get_mission(id).await?;
            if !mission.can_edit {
                println!("Mission #{id} was not created by you; it cannot be edited.");
                return Ok(());
            }

            let mut form = MissionForm::edit(&mission);
            if let Some(description) = description {
                form.draft.description = description;
            }
            if start.is_some() {
                form.draft.assigned_date = start;
            }
            if end.is_some() {
                form.draft.end_date = end;
            }
            if let Some(route) = route {
                form.draft.from_to = route;
            }
            for user_id in toggle_user {
                form.draft.toggle_user(user_id);
            }

            submit_form(form, attach, detach, gateway).await
        }

        Commands::Users => {
            let profile = gateway.profile().await?;
            let users = gateway.assignable_users().await?;
            let viewer = profile.user.role;

            println!("Assignable users ({}), • = you can assign", users.len());
            render::print_users(&users, |target| policy::can_assign_to(viewer, target));
            Ok(())
        }

        Commands::OrgChart => {
            let chart = gateway.organization_chart().await?;
            render::print_org_chart(&chart);
            Ok(())
        }

        Commands::Profile => {
            let profile = gateway.profile().await?;
            render::print_profile(&profile);
            Ok(())
        }
    }
}

/// Fetches all missions; `None` when interrupted with Ctrl-C
async fn load_store(gateway: &dyn Gateway) -> DeskResult<Option<MissionStore>> {
    let mut store = MissionStore::default();

    // Ctrl-C tears the view down; the watcher ends with the store.
    let cancel = store.cancellation();
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    cancel.cancel();
                }
            }
        }
    });

    if store.refresh(gateway).await? {
        Ok(Some(store))
    } else {
        tracing::info!("interrupted, nothing loaded");
        Ok(None)
    }
}

/// Adds the upload list, applies `--detach` and submits the form
async fn submit_form(
    mut form: MissionForm,
    attach: Vec<PathBuf>,
    mut detach: Vec<usize>,
    gateway: &dyn Gateway,
) -> DeskResult<()> {
    for path in attach {
        form.draft.add_attachment(path);
    }

    // Highest index first so earlier positions stay valid.
    detach.sort_unstable_by(|a, b| b.cmp(a));
    detach.dedup();
    for index in detach {
        if form.draft.remove_attachment(index).is_none() {
            tracing::warn!(index, "no attachment at this position");
        }
    }

    let action = if form.editing().is_some() { "updated" } else { "created" };
    let saved = form.submit(gateway).await?;
    println!("✅ Mission #{} {action}", saved.id);
    Ok(())
}

/// Toggles completion; `only_if_completed` guards archive restores
async fn toggle(gateway: &dyn Gateway, id: u64, only_if_completed: Option<bool>) -> DeskResult<()> {
    let Some(mut store) = load_store(gateway).await? else {
        return Ok(());
    };

    let mission = store.get(id).ok_or(DeskError::UnknownMission(id))?;
    if let Some(expected) = only_if_completed
        && mission.completed != expected
    {
        println!("Mission #{id} is not in the archive.");
        return Ok(());
    }
    if !mission.can_complete {
        println!("Mission #{id} is not assigned to you; it cannot be completed.");
        return Ok(());
    }

    match store.toggle_complete(gateway, id).await? {
        Settlement::Committed => {
            let completed = store.get(id).is_some_and(|m| m.completed);
            let state = if completed { "completed" } else { "pending" };
            println!("✅ Mission #{id} is now {state}");
        }
        Settlement::Abandoned => println!("Interrupted; mission #{id} left unchanged."),
    }
    Ok(())
}

async fn statistics(gateway: &dyn Gateway, selected: Option<u64>) -> DeskResult<()> {
    let profile = gateway.profile().await?;
    let users = gateway.assignable_users().await?;
    let Some(store) = load_store(gateway).await? else {
        return Ok(());
    };

    let viewer = profile.user;
    let session = ViewSession::starting_today(Some(viewer.clone()));
    let visible: Vec<models::User> = policy::visible_users(&viewer, &users)
        .into_iter()
        .cloned()
        .collect();

    if let Some(id) = selected
        && id != viewer.id
        && !visible.iter().any(|u| u.id == id)
    {
        println!("You cannot view statistics for user #{id}.");
        return Ok(());
    }

    let missions = store.missions();
    let scope = session.statistics_scope(selected, missions);
    let today = session.today;

    let selected_user = selected.and_then(|id| {
        std::iter::once(&viewer)
            .chain(users.iter())
            .find(|u| u.id == id)
    });
    let heading = match selected_user {
        Some(user) => format!("📊 Performance report: {}", user.display_name()),
        None if viewer.role == models::Role::Employee => {
            format!("📊 Performance report: {}", viewer.display_name())
        }
        None if policy::can_view_all_users(viewer.role) => "📊 Company-wide statistics".to_string(),
        None => "📊 Employee statistics".to_string(),
    };

    render::print_snapshot(&heading, &stats::calculate_stats(scope.iter().copied(), today));

    let company_view = selected.is_none() && policy::can_view_employees(viewer.role);
    if company_view {
        println!();
        render::print_snapshot(
            "This month",
            &stats::current_month_report(missions, today),
        );
    }

    println!();
    render::print_trend(&stats::monthly_trend(scope.iter().copied(), today));
    println!();
    render::print_distribution(&stats::status_distribution(scope.iter().copied(), today));
    println!();
    render::print_histogram(&stats::completion_time_histogram(scope.iter().copied()));
    println!();
    render::print_radar(&stats::radar_metrics(scope.iter().copied(), today));

    if company_view {
        println!();
        render::print_comparison(&stats::user_comparison(&visible, missions, today));
    }

    Ok(())
}
