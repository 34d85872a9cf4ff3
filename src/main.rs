use std::sync::Arc;

use anyhow::{Context, Result};
use asset_lifecycle::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{
        acquisition_line_item, allocation, asset, asset_issue,
        asset::AssetStatus,
        asset_issue::{IssueCategory, IssuePriority},
        asset_log,
    },
    services::{AppServices, EmployeeInfo, LineItemInput, PurchaseOrderInput},
};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;
    let actor = cli.actor;

    match cli.command {
        Commands::Po(command) => handle_po_command(&context, command, cli.json).await?,
        Commands::Assets(command) => handle_assets_command(&context, command, actor, cli.json).await?,
        Commands::Allocate(args) => handle_allocate(&context, args, actor, cli.json).await?,
        Commands::Deallocate(args) => handle_deallocate(&context, args, actor, cli.json).await?,
        Commands::Issues(command) => handle_issues_command(&context, command, actor, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "ams", about = "Asset lifecycle management CLI", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    /// Employee id recorded as the actor on audit entries
    #[arg(long, global = true)]
    actor: Option<i32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Purchase orders and their line items
    #[command(subcommand)]
    Po(PoCommands),
    #[command(subcommand)]
    Assets(AssetCommands),
    /// Hand an asset to an employee
    Allocate(AllocateArgs),
    /// Return an allocated asset to the pool
    Deallocate(DeallocateArgs),
    /// Repair tickets
    #[command(subcommand)]
    Issues(IssueCommands),
}

#[derive(Subcommand)]
enum PoCommands {
    Create(CreatePoArgs),
    AddLine(AddLineArgs),
    Lines { po_no: String },
}

#[derive(Args)]
struct CreatePoArgs {
    #[arg(long)]
    po_no: String,
    #[arg(long, help = "Purchase order date (YYYY-MM-DD)")]
    po_date: NaiveDate,
    #[arg(long)]
    qty: i32,
    #[arg(long)]
    value: Decimal,
    #[arg(long)]
    vendor_code: Option<String>,
    #[arg(long)]
    vendor_name: Option<String>,
    #[arg(long)]
    sap_id: Option<i32>,
    #[arg(long)]
    dept: Option<String>,
}

#[derive(Args)]
struct AddLineArgs {
    #[arg(long)]
    po_no: String,
    #[arg(long)]
    qty: i32,
    #[arg(long)]
    value: Decimal,
    #[arg(long = "type")]
    li_type: Option<String>,
    #[arg(long)]
    material_code: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Subcommand)]
enum AssetCommands {
    /// Tag new Free assets out of a line item
    Tag {
        #[arg(long)]
        line_item: i32,
        #[arg(long, default_value_t = 1)]
        quantity: i32,
    },
    /// Create one asset from a line item and allocate it immediately
    AllocateNew {
        #[arg(long)]
        line_item: i32,
        #[command(flatten)]
        employee: EmployeeArgs,
    },
    Show { tag: String },
    List {
        #[arg(long, default_value = "Free")]
        status: AssetStatus,
    },
    /// Audit trail of an asset
    History { tag: String },
    /// Custody rows of an asset
    Allocations { tag: String },
}

#[derive(Args)]
struct EmployeeArgs {
    #[arg(long = "name")]
    employee_name: Option<String>,
    #[arg(long)]
    sap_id: Option<i32>,
    #[arg(long)]
    designation: Option<String>,
    #[arg(long)]
    division: Option<String>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    building: Option<String>,
}

impl EmployeeArgs {
    fn into_employee(self) -> Option<EmployeeInfo> {
        let name = self.employee_name?;
        Some(EmployeeInfo {
            name,
            sap_id: self.sap_id,
            designation: self.designation,
            division: self.division,
            department: self.department,
            phone: self.phone,
            building: self.building,
            role: None,
        })
    }
}

#[derive(Args)]
struct AllocateArgs {
    tag: String,
    #[command(flatten)]
    employee: EmployeeArgs,
}

#[derive(Args)]
struct DeallocateArgs {
    tag: String,
    #[arg(long)]
    reason: Option<String>,
}

#[derive(Subcommand)]
enum IssueCommands {
    Raise {
        tag: String,
        #[arg(long, default_value = "Hardware")]
        category: IssueCategory,
        #[arg(long, default_value = "Medium")]
        priority: IssuePriority,
        #[arg(long)]
        description: String,
    },
    Assign {
        id: i32,
        #[arg(long)]
        technician: i32,
    },
    /// Technician update: StartRepair, InRepair or WaitingForPart
    Update {
        id: i32,
        #[arg(long)]
        technician: i32,
        #[arg(long)]
        action: String,
        #[arg(long)]
        note: Option<String>,
    },
    Complete {
        id: i32,
        #[arg(long)]
        technician: i32,
        #[arg(long)]
        resolution: String,
    },
    /// Admin decision: free, reallocate or condemn
    Finalize {
        id: i32,
        #[arg(long)]
        action: String,
        #[command(flatten)]
        employee: EmployeeArgs,
    },
    Show { id: i32 },
    Open,
    Queue {
        #[arg(long)]
        technician: i32,
    },
    Pending,
}

struct CliContext {
    _config: AppConfig,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool: DbPool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        db::check_connection(&db_pool)
            .await
            .context("database is not reachable")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to run migrations")?;
        }
        debug!(environment = %config.environment, "CLI context ready");

        let services = AppServices::new(Arc::new(db_pool), config.lifecycle().clone());
        Ok(Self {
            _config: config,
            services,
        })
    }
}

async fn handle_po_command(context: &CliContext, command: PoCommands, json: bool) -> Result<()> {
    let service = &context.services.acquisitions;
    match command {
        PoCommands::Create(args) => {
            let po = service
                .create_purchase_order(PurchaseOrderInput {
                    po_no: args.po_no,
                    po_date: args.po_date,
                    qty: args.qty,
                    vendor_code: args.vendor_code,
                    vendor_name: args.vendor_name,
                    po_value: args.value,
                    sap_id: args.sap_id,
                    dept: args.dept,
                })
                .await
                .context("failed to create purchase order")?;
            if json {
                print_json(&po)?;
            } else {
                println!("Purchase order {} recorded (id {})", po.po_no, po.id);
            }
        }
        PoCommands::AddLine(args) => {
            let line = service
                .add_line_item(LineItemInput {
                    po_no: args.po_no,
                    li_type: args.li_type,
                    material_code: args.material_code,
                    material_description: args.description,
                    qty: args.qty,
                    po_value: args.value,
                })
                .await
                .context("failed to add line item")?;
            if json {
                print_json(&line)?;
            } else {
                render_line_item(&line);
            }
        }
        PoCommands::Lines { po_no } => {
            let lines = service
                .line_items(&po_no)
                .await
                .with_context(|| format!("failed to list line items of {}", po_no))?;
            if json {
                print_json(&lines)?;
            } else {
                lines.iter().for_each(render_line_item);
            }
        }
    }
    Ok(())
}

async fn handle_assets_command(
    context: &CliContext,
    command: AssetCommands,
    actor: Option<i32>,
    json: bool,
) -> Result<()> {
    let services = &context.services;
    match command {
        AssetCommands::Tag {
            line_item,
            quantity,
        } => {
            let assets = services
                .acquisitions
                .create_assets_from_line_item(line_item, quantity, actor)
                .await
                .with_context(|| format!("failed to tag assets from line item {}", line_item))?;
            if json {
                print_json(&assets)?;
            } else {
                assets.iter().for_each(render_asset);
            }
        }
        AssetCommands::AllocateNew {
            line_item,
            employee,
        } => {
            let employee = employee
                .into_employee()
                .context("--name is required to allocate")?;
            let outcome = services
                .allocations
                .allocate_from_line_item(line_item, employee, actor)
                .await
                .with_context(|| format!("failed to allocate from line item {}", line_item))?;
            if json {
                print_json(&outcome)?;
            } else {
                render_asset(&outcome.asset);
                render_allocation(&outcome.allocation);
            }
        }
        AssetCommands::Show { tag } => {
            let asset = services
                .allocations
                .find_asset(&tag)
                .await
                .with_context(|| format!("failed to fetch asset {}", tag))?;
            if json {
                print_json(&asset)?;
            } else {
                render_asset(&asset);
            }
        }
        AssetCommands::List { status } => {
            let assets = services
                .allocations
                .assets_with_status(status)
                .await
                .context("failed to list assets")?;
            if json {
                print_json(&assets)?;
            } else {
                assets.iter().for_each(render_asset);
            }
        }
        AssetCommands::History { tag } => {
            let entries = services
                .audit_log
                .asset_history(&tag)
                .await
                .with_context(|| format!("failed to fetch history of {}", tag))?;
            if json {
                print_json(&entries)?;
            } else {
                entries.iter().for_each(render_log_entry);
            }
        }
        AssetCommands::Allocations { tag } => {
            let rows = services
                .allocations
                .allocation_history(&tag)
                .await
                .with_context(|| format!("failed to fetch allocations of {}", tag))?;
            if json {
                print_json(&rows)?;
            } else {
                rows.iter().for_each(render_allocation);
            }
        }
    }
    Ok(())
}

async fn handle_allocate(
    context: &CliContext,
    args: AllocateArgs,
    actor: Option<i32>,
    json: bool,
) -> Result<()> {
    let employee = args
        .employee
        .into_employee()
        .context("--name is required to allocate")?;
    let outcome = context
        .services
        .allocations
        .allocate(&args.tag, employee, actor)
        .await
        .with_context(|| format!("failed to allocate {}", args.tag))?;
    if json {
        print_json(&outcome)?;
    } else {
        println!("{} {}", outcome.action, outcome.asset.tag);
        render_allocation(&outcome.allocation);
    }
    Ok(())
}

async fn handle_deallocate(
    context: &CliContext,
    args: DeallocateArgs,
    actor: Option<i32>,
    json: bool,
) -> Result<()> {
    let outcome = context
        .services
        .allocations
        .deallocate(&args.tag, args.reason, actor)
        .await
        .with_context(|| format!("failed to deallocate {}", args.tag))?;
    if json {
        print_json(&outcome)?;
    } else {
        println!("{} {}", outcome.action, outcome.asset.tag);
    }
    Ok(())
}

async fn handle_issues_command(
    context: &CliContext,
    command: IssueCommands,
    actor: Option<i32>,
    json: bool,
) -> Result<()> {
    let service = &context.services.issues;
    let issues = match command {
        IssueCommands::Raise {
            tag,
            category,
            priority,
            description,
        } => vec![service
            .raise_issue_with_priority(&tag, actor, category, priority, &description)
            .await
            .with_context(|| format!("failed to raise issue on {}", tag))?],
        IssueCommands::Assign { id, technician } => vec![service
            .assign_technician(id, technician, actor)
            .await
            .with_context(|| format!("failed to assign issue {}", id))?],
        IssueCommands::Update {
            id,
            technician,
            action,
            note,
        } => vec![service
            .update_technician_status(id, technician, &action, note)
            .await
            .with_context(|| format!("failed to update issue {}", id))?],
        IssueCommands::Complete {
            id,
            technician,
            resolution,
        } => vec![service
            .complete_repair(id, technician, &resolution)
            .await
            .with_context(|| format!("failed to complete issue {}", id))?],
        IssueCommands::Finalize {
            id,
            action,
            employee,
        } => {
            let outcome = service
                .admin_finalize_repair(id, actor, &action, employee.into_employee())
                .await
                .with_context(|| format!("failed to finalize issue {}", id))?;
            if json {
                print_json(&outcome)?;
            } else {
                println!("Issue {} finalized: {}", outcome.issue.id, outcome.action);
                render_asset(&outcome.asset);
                if let Some(row) = &outcome.allocation {
                    render_allocation(row);
                }
            }
            return Ok(());
        }
        IssueCommands::Show { id } => vec![service
            .find_issue(id)
            .await
            .with_context(|| format!("failed to fetch issue {}", id))?],
        IssueCommands::Open => service
            .open_issues()
            .await
            .context("failed to list open issues")?,
        IssueCommands::Queue { technician } => service
            .technician_queue(technician)
            .await
            .with_context(|| format!("failed to list queue of technician {}", technician))?,
        IssueCommands::Pending => {
            let pending = service
                .pending_finalization()
                .await
                .context("failed to list pending finalizations")?;
            if json {
                print_json(&pending)?;
            } else {
                for item in &pending {
                    render_issue(&item.issue);
                    if let Some(asset) = &item.asset {
                        render_asset(asset);
                    }
                }
            }
            return Ok(());
        }
    };

    if json {
        print_json(&issues)?;
    } else {
        issues.iter().for_each(render_issue);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_asset(asset: &asset::Model) {
    println!(
        "- Asset {} • {} • status {} • value {}",
        asset.tag, asset.description, asset.status, asset.value
    );
}

fn render_allocation(row: &allocation::Model) {
    println!(
        "  allocation #{} • {} • to {} (sap {}) • cycle {}{}",
        row.id,
        row.status,
        row.allocated_to.as_deref().unwrap_or("-"),
        row.sap_id.map_or_else(|| "N/A".to_string(), |id| id.to_string()),
        row.cycle_count,
        if row.active { "" } else { " • inactive" }
    );
}

fn render_issue(issue: &asset_issue::Model) {
    println!(
        "- Issue {} • {} • {} / {} • status {}{}",
        issue.id,
        issue.tag,
        issue.category,
        issue.priority,
        issue.status,
        issue
            .assigned_to
            .map(|t| format!(" • technician {}", t))
            .unwrap_or_default()
    );
}

fn render_line_item(line: &acquisition_line_item::Model) {
    println!(
        "- Line item {} • PO {} • qty {} • available {} • allocated {} • tagged {}",
        line.id, line.po_no, line.qty, line.available_qty, line.allocated_qty, line.created_assets
    );
}

fn render_log_entry(entry: &asset_log::Model) {
    println!(
        "{} • {} • by {} • {}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S"),
        entry.event,
        entry.performed_by,
        entry.details.as_deref().unwrap_or("")
    );
}
