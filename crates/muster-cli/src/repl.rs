//! Interactive operator console
//!
//! One REPL session is one console session: the push feed, the status probe
//! and the panel subscriptions run alongside the input loop and stop when
//! the operator quits.

use colored::Colorize;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use muster_core::dispatch::ChatTurn;
use muster_core::store::{MergeOutcome, WaypointEvent};
use muster_core::waypoint::survey_grid;
use muster_core::{
    Console, ConsoleError, DispatchOutcome, GeoPoint, OperationMode, OperatorRole, PlanContext,
    PlannerApi, RoleStore, WaypointDraft,
};
use muster_uplink::{ConsoleConfig, FeedSupervisor, HttpPlanner, LinkHandle};

enum Flow {
    Continue,
    Quit,
}

struct Repl {
    console: Console,
    planner: Arc<HttpPlanner>,
    link: LinkHandle,
    ctx: PlanContext,
    history: Vec<ChatTurn>,
}

/// Run the interactive console until the operator quits
pub async fn run(config: ConsoleConfig) -> anyhow::Result<()> {
    banner();

    let roles = Arc::new(RoleStore::new());
    match roles.init().await? {
        Some(role) => println!("Signed in as {}", role.to_string().green()),
        None => println!("No saved role; use {} to pick one", "role <name>".bold()),
    }

    let planner = Arc::new(HttpPlanner::new(&config)?);
    let console = Console::new(planner.clone(), roles);

    let _subscriptions = console.spawn_default_subscriptions();
    let supervisor = FeedSupervisor::new(&config, console.store(), console.live_flag())?;
    let link = supervisor.handle();
    let feed = tokio::spawn(supervisor.run(console.subscribe_shutdown()));
    let probe = planner.spawn_status_probe(config.status_poll_secs, console.subscribe_shutdown());

    let mut repl = Repl {
        console,
        planner,
        link,
        ctx: PlanContext::default(),
        history: Vec::new(),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    repl.prompt()?;
    while let Some(line) = lines.next_line().await? {
        match repl.dispatch_line(line.trim()).await {
            Flow::Quit => break,
            Flow::Continue => repl.prompt()?,
        }
    }

    repl.console.shutdown();
    let _ = feed.await;
    let _ = probe.await;
    println!("Session closed.");
    Ok(())
}

fn banner() {
    println!("{}", "Muster operator console".bold());
    println!(
        "core {}  -  type {} for commands",
        muster_core::VERSION,
        "help".bold()
    );
    println!();
}

fn parse_coord(args: &[&str]) -> muster_core::Result<GeoPoint> {
    let (lat, lon) = match (args.first(), args.get(1)) {
        (Some(lat), Some(lon)) => (*lat, *lon),
        _ => {
            return Err(ConsoleError::Validation(
                "expected: <lat> <lon>".to_string(),
            ))
        }
    };
    let lat = lat
        .parse::<f64>()
        .map_err(|_| ConsoleError::Validation(format!("bad latitude: {}", lat)))?;
    let lon = lon
        .parse::<f64>()
        .map_err(|_| ConsoleError::Validation(format!("bad longitude: {}", lon)))?;
    Ok(GeoPoint::new(lat, lon))
}

impl Repl {
    fn prompt(&self) -> anyhow::Result<()> {
        let mode = self.ctx.mode.map(|m| m.as_str()).unwrap_or("no-mode");
        print!("{} ", format!("muster[{}]>", mode).bold());
        std::io::stdout().flush()?;
        Ok(())
    }

    async fn dispatch_line(&mut self, line: &str) -> Flow {
        if line.is_empty() {
            return Flow::Continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let result = match command {
            "help" | "?" => {
                self.print_help();
                Ok(())
            }
            "mode" => self.cmd_mode(&args),
            "dest" => self.cmd_dest(&args),
            "loc" => self.cmd_loc(&args),
            "add" => self.cmd_add(&args),
            "del" => self.cmd_del(&args),
            "wps" => {
                self.print_waypoints();
                Ok(())
            }
            "grid" => self.cmd_grid(&args),
            "cleanup" => self.cmd_cleanup().await,
            "recommend" => self.cmd_recommend().await,
            "takeover" => self.cmd_takeover().await,
            "execute" => self.cmd_execute().await,
            "advise" => self.cmd_advise(&args).await,
            "status" => self.cmd_status().await,
            "state" => self.cmd_state(),
            "log" => {
                self.print_log();
                Ok(())
            }
            "role" => self.cmd_role(&args).await,
            "logout" => self.cmd_logout().await,
            "quit" | "exit" => return Flow::Quit,
            other => Err(ConsoleError::Validation(format!(
                "unknown command: {} (try help)",
                other
            ))),
        };
        if let Err(err) = result {
            println!("{}", format!("x {}", err).red());
        }
        Flow::Continue
    }

    fn print_help(&self) {
        println!("Targeting");
        println!("  mode [token]            list modes, or select one");
        println!("  loc <lat> <lon>         set the operation center");
        println!("  dest <lat> <lon>        set the destination");
        println!("Waypoints");
        println!("  add <lat> <lon> [alt] [name]   append a waypoint");
        println!("  del <id>                delete a waypoint");
        println!("  wps                     list the current sequence");
        println!("  grid <rows> <cols> <spacing_m>  load a survey grid at loc");
        println!("Planning");
        println!("  cleanup                 ask the backend to clean up the route");
        println!("  recommend               ask for a recommended route");
        println!("  takeover                hand the sequence to the AI pilot");
        println!("  execute                 fly the current sequence");
        println!("  advise <message>        ask the AI advisor");
        println!("Session");
        println!("  status | state | log    inspect the session");
        println!("  role [name] | logout    manage the saved role");
        println!("  quit                    close the session");
    }

    fn cmd_mode(&mut self, args: &[&str]) -> muster_core::Result<()> {
        match args.first() {
            None => {
                println!("Available modes:");
                for mode in OperationMode::all() {
                    println!("  {:24} {}", mode.as_str(), mode.label());
                }
                Ok(())
            }
            Some(token) => {
                let mode: OperationMode = token.parse()?;
                self.ctx.mode = Some(mode);
                self.console.dispatcher().note_mode_change();
                println!("Mode set to {}", mode.label().green());
                Ok(())
            }
        }
    }

    fn cmd_dest(&mut self, args: &[&str]) -> muster_core::Result<()> {
        let point = parse_coord(args)?;
        self.ctx.destination = Some(point);
        println!("Destination set to {:.4}, {:.4}", point.lat, point.lon);
        Ok(())
    }

    fn cmd_loc(&mut self, args: &[&str]) -> muster_core::Result<()> {
        let point = parse_coord(args)?;
        self.ctx.location = Some(point);
        println!("Center set to {:.4}, {:.4}", point.lat, point.lon);
        Ok(())
    }

    fn cmd_add(&mut self, args: &[&str]) -> muster_core::Result<()> {
        let point = parse_coord(args)?;
        let mut draft = WaypointDraft::at(point.lat, point.lon);
        if let Some(alt) = args.get(2) {
            let alt = alt
                .parse::<f64>()
                .map_err(|_| ConsoleError::Validation(format!("bad altitude: {}", alt)))?;
            draft = draft.with_alt(alt);
        }
        if args.len() > 3 {
            draft = draft.with_name(args[3..].join(" "));
        }
        match self
            .console
            .store()
            .apply_waypoint_event(WaypointEvent::Add(draft))
        {
            MergeOutcome::Applied => {
                let total = self.console.store().snapshot().waypoints.len();
                println!("Added waypoint ({} total)", total);
            }
            MergeOutcome::NoOp => println!("No change"),
            MergeOutcome::Suppressed => println!("Edit vetoed by merge policy"),
        }
        Ok(())
    }

    fn cmd_del(&mut self, args: &[&str]) -> muster_core::Result<()> {
        let id = args
            .first()
            .ok_or_else(|| ConsoleError::Validation("expected: del <id>".to_string()))?;
        match self
            .console
            .store()
            .apply_waypoint_event(WaypointEvent::Delete((*id).to_string()))
        {
            MergeOutcome::Applied => println!("Deleted {}", id),
            MergeOutcome::NoOp => println!("No waypoint with id {}", id),
            MergeOutcome::Suppressed => {
                println!("Veto: removing the last waypoint would clear the sequence")
            }
        }
        Ok(())
    }

    fn print_waypoints(&self) {
        let waypoints = self.console.store().snapshot().waypoints;
        if waypoints.is_empty() {
            println!("No waypoints");
            return;
        }
        for wp in &waypoints {
            println!(
                "  {:20} {:>9.4} {:>9.4} {:>5.0}m  {}",
                wp.id, wp.lat, wp.lon, wp.alt, wp.name
            );
        }
    }

    fn cmd_grid(&mut self, args: &[&str]) -> muster_core::Result<()> {
        let usage = || ConsoleError::Validation("expected: grid <rows> <cols> <spacing_m>".to_string());
        let rows = args.first().ok_or_else(usage)?.parse::<u32>().map_err(|_| usage())?;
        let cols = args.get(1).ok_or_else(usage)?.parse::<u32>().map_err(|_| usage())?;
        let spacing = args.get(2).ok_or_else(usage)?.parse::<f64>().map_err(|_| usage())?;
        let center = self.ctx.location.ok_or_else(|| {
            ConsoleError::Validation("set a center first with loc <lat> <lon>".to_string())
        })?;

        let drafts = survey_grid(center, rows, cols, spacing);
        let count = drafts.len();
        self.console.store().ingest_batch(drafts);
        println!("Loaded {} survey waypoints", count);
        Ok(())
    }

    fn report_outcome(&self, label: &str, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Completed {
                reason: Some(reason),
            } => println!("{} {}", "ok".green(), reason),
            DispatchOutcome::Completed { reason: None } => {
                println!("{} {} completed", "ok".green(), label)
            }
            DispatchOutcome::Superseded => {
                println!("{}", "Result discarded (context changed)".yellow())
            }
        }
    }

    async fn cmd_cleanup(&mut self) -> muster_core::Result<()> {
        let outcome = self.console.dispatcher().cleanup_route(&self.ctx).await?;
        self.report_outcome("Route cleanup", outcome);
        Ok(())
    }

    async fn cmd_recommend(&mut self) -> muster_core::Result<()> {
        let outcome = self.console.dispatcher().recommend_route(&self.ctx).await?;
        self.report_outcome("Route recommendation", outcome);
        Ok(())
    }

    async fn cmd_takeover(&mut self) -> muster_core::Result<()> {
        let outcome = self.console.dispatcher().takeover(&self.ctx).await?;
        self.report_outcome("AI takeover", outcome);
        Ok(())
    }

    async fn cmd_execute(&mut self) -> muster_core::Result<()> {
        let response = self.console.dispatcher().execute_mission().await?;
        let status = response.status.as_deref().unwrap_or("unknown");
        match response.message {
            Some(message) => println!("{} {} ({})", "ok".green(), message, status),
            None => println!("{} mission {}", "ok".green(), status),
        }
        Ok(())
    }

    async fn cmd_advise(&mut self, args: &[&str]) -> muster_core::Result<()> {
        let message = args.join(" ");
        let outcome = self
            .console
            .dispatcher()
            .request_advice(&self.ctx, message.clone(), self.history.clone())
            .await?;
        if let DispatchOutcome::Completed {
            reason: Some(reply),
        } = outcome
        {
            println!("{}", reply.cyan());
            self.history.push(ChatTurn::operator(message));
            self.history.push(ChatTurn::advisor(reply));
        }
        Ok(())
    }

    async fn cmd_status(&mut self) -> muster_core::Result<()> {
        println!(
            "Link: {:?}  (connected: {})",
            self.link.state(),
            self.console.store().snapshot().connected
        );
        if self.planner.is_offline() {
            println!("{}", "Backend flagged offline".red());
            return Ok(());
        }
        let report = self.planner.status().await?;
        println!(
            "Backend: running={} authenticated={}",
            report.running, report.authenticated
        );
        if let Some(online) = report.drones_online {
            println!("Drones online: {}", online);
        }
        Ok(())
    }

    fn cmd_state(&self) -> muster_core::Result<()> {
        let state = self.console.store().snapshot();
        println!("{}", serde_json::to_string_pretty(&state)?);
        Ok(())
    }

    fn print_log(&self) {
        let log = self.console.store().snapshot().command_log;
        if log.is_empty() {
            println!("Command log is empty");
            return;
        }
        for entry in &log {
            println!("  {} {}", entry.timestamp.dimmed(), entry.message);
        }
    }

    async fn cmd_role(&mut self, args: &[&str]) -> muster_core::Result<()> {
        match args.first() {
            None => {
                match self.console.roles().current() {
                    Some(role) => println!("Current role: {}", role),
                    None => println!("No role set"),
                }
                Ok(())
            }
            Some(token) => {
                let role: OperatorRole = token.parse()?;
                self.console.roles().set(role).await?;
                println!("Role set to {}", role.to_string().green());
                Ok(())
            }
        }
    }

    async fn cmd_logout(&mut self) -> muster_core::Result<()> {
        self.console.roles().clear().await?;
        println!("Role cleared");
        Ok(())
    }
}
