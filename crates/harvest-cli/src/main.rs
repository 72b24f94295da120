//! Command-line front end for managing marketplace orders.
//!
//! Every status change is checked against the order lifecycle before it is
//! sent. A refused change or a failed update is printed as `error: <message>`
//! and the process exits with a failure status.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use harvest_client::{create_order_api, ClientError, OrderApi};
use harvest_config::{Config, ConfigError};
use harvest_core::lifecycle::actions_for;
use harvest_core::{OrderSession, OrderStateError, OrderStateMachine, TransitionExtras};
use harvest_types::{Actor, OrderQuery, OrderStatus, StatusFilter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

mod render;

use render::OrderView;

/// Command-line arguments for the order tool.
#[derive(Parser, Debug)]
#[command(name = "harvest", author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	/// Print results as JSON
	#[arg(long, global = true)]
	json: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show what the lifecycle allows from a status (no config needed)
	Transitions {
		status: OrderStatus,
		/// Role to evaluate for
		#[arg(long, default_value = "farmer")]
		actor: Actor,
	},
	#[command(flatten)]
	Order(OrderCommand),
}

/// Commands that talk to the order service.
#[derive(Subcommand, Debug)]
enum OrderCommand {
	/// Show one order and its available actions
	Show { id: String },
	/// Move an order to its next step
	Advance {
		id: String,
		/// Attached when the order ships
		#[arg(long)]
		tracking_number: Option<String>,
	},
	/// Move an order to a specific status
	Update {
		id: String,
		status: OrderStatus,
		#[arg(long)]
		tracking_number: Option<String>,
		/// RFC 3339 timestamp, attached when the order ships
		#[arg(long)]
		estimated_arrival: Option<DateTime<Utc>>,
	},
	/// Cancel an order
	Cancel {
		id: String,
		/// Required when acting as a buyer
		#[arg(long)]
		reason: Option<String>,
	},
	/// List orders
	List {
		/// A status, or "all"
		#[arg(long, default_value = "all")]
		status: StatusFilter,
		#[arg(long, default_value_t = 1)]
		page: u32,
		#[arg(long, default_value_t = 20)]
		limit: u32,
	},
}

/// Errors surfaced by a command.
#[derive(Debug, Error)]
enum CliError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Client(#[from] ClientError),
	#[error(transparent)]
	Order(#[from] OrderStateError),
	#[error("Failed to encode output: {0}")]
	Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	match report(run(&args).await) {
		Ok(output) => {
			println!("{}", output);
			ExitCode::SUCCESS
		},
		Err(message) => {
			eprintln!("{}", message);
			ExitCode::FAILURE
		},
	}
}

/// Turns a command result into the text for stdout, or the `error:` line for stderr.
fn report(result: Result<String, CliError>) -> Result<String, String> {
	result.map_err(|e| format!("error: {}", e))
}

/// Executes the command and returns what should be printed.
async fn run(args: &Args) -> Result<String, CliError> {
	match &args.command {
		Command::Transitions { status, actor } => {
			let actions = actions_for(*actor, *status);
			if args.json {
				Ok(serde_json::to_string_pretty(&actions)?)
			} else {
				Ok(render::transitions(&actions))
			}
		},
		Command::Order(command) => {
			let config = Config::from_file(&args.config.to_string_lossy()).await?;
			tracing::info!(
				actor = %config.session.actor,
				client = %config.client.primary,
				"Loaded configuration"
			);
			let machine = build_machine(&config)?;
			execute(command, machine, args.json).await
		},
	}
}

async fn execute(
	command: &OrderCommand,
	machine: OrderStateMachine,
	json: bool,
) -> Result<String, CliError> {
	match command {
		OrderCommand::List {
			status,
			page,
			limit,
		} => {
			let query = OrderQuery {
				page: *page,
				limit: *limit,
				status: *status,
			};
			let orders = machine.list_orders(&query).await?;
			if json {
				Ok(serde_json::to_string_pretty(&orders)?)
			} else {
				Ok(render::order_list(&orders))
			}
		},
		OrderCommand::Show { id } => {
			let session = OrderSession::load(machine, id).await?;
			show(&session, json)
		},
		OrderCommand::Advance {
			id,
			tracking_number,
		} => {
			let mut session = OrderSession::load(machine, id).await?;
			session.advance(tracking_number.clone()).await?;
			show(&session, json)
		},
		OrderCommand::Update {
			id,
			status,
			tracking_number,
			estimated_arrival,
		} => {
			let mut session = OrderSession::load(machine, id).await?;
			let extras = TransitionExtras {
				tracking_number: tracking_number.clone(),
				estimated_arrival: *estimated_arrival,
				..Default::default()
			};
			session.transition(*status, extras).await?;
			show(&session, json)
		},
		OrderCommand::Cancel { id, reason } => {
			let mut session = OrderSession::load(machine, id).await?;
			session.cancel(reason.clone()).await?;
			show(&session, json)
		},
	}
}

fn build_machine(config: &Config) -> Result<OrderStateMachine, CliError> {
	let api: Arc<dyn OrderApi> = Arc::from(create_order_api(
		&config.client.primary,
		&config.client.implementations,
	)?);
	Ok(OrderStateMachine::new(api, config.session.actor))
}

fn show(session: &OrderSession, json: bool) -> Result<String, CliError> {
	let view = OrderView {
		order: session.order(),
		actions: session.available_actions(),
	};
	if json {
		Ok(serde_json::to_string_pretty(&view)?)
	} else {
		Ok(render::order(&view))
	}
}
