//! `bloodbridge` - CLI for the BloodBridge record store and hospital locator.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use clap::Parser;
use tracing::debug;

use bloodbridge::cli::{
    Cli, Command, ConfigCommand, EmergencyCommand, FieldArgs, HospitalsCommand, RecordCommand,
};
use bloodbridge::locator::{
    render_popup_html, Coordinates, FixedLocation, Hospital, HospitalLocator, HospitalSelection,
    NominatimGeocoder, OverpassSource,
};
use bloodbridge::record::{
    Collection, Donors, Emergencies, EmergencyRecord, Record, Staff, Status,
};
use bloodbridge::storage::{KeyValueBackend, MemoryBackend, SqliteBackend};
use bloodbridge::{init_logging, BackendKind, Config, RecordStore};

type Store = RecordStore<Box<dyn KeyValueBackend>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Validation must not require the active configuration to load first.
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return handle_validate(file.clone().or_else(|| cli.config.clone()));
    }

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Donor(cmd) => {
            handle_records::<Donors>(&open_store(&config)?, cmd, Store::requests_for_donor)
        }
        Command::Staff(cmd) => {
            handle_records::<Staff>(&open_store(&config)?, cmd, Store::requests_for_staff)
        }
        Command::Emergency(cmd) => handle_emergency(&open_store(&config)?, &config, cmd),
        Command::Stats(cmd) => handle_stats(&open_store(&config)?, cmd.json),
        Command::Export(cmd) => handle_export(&open_store(&config)?, cmd.output),
        Command::Hospitals(cmd) => handle_hospitals(&config, &cmd).await,
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<Store> {
    let backend: Box<dyn KeyValueBackend> = match config.storage.backend {
        BackendKind::Sqlite => {
            let path = config.database_path();
            Box::new(
                SqliteBackend::open(&path)
                    .with_context(|| format!("opening record store at {}", path.display()))?,
            )
        }
        BackendKind::Memory => Box::new(MemoryBackend::new()),
    };
    debug!("Opened {} record store", config.storage.backend);
    Ok(RecordStore::new(backend))
}

/// Finds the emergency requests relevant to one applicant.
type RequestFinder = fn(&Store, &str) -> Option<Vec<EmergencyRecord>>;

fn handle_records<C: Collection>(
    store: &Store,
    cmd: RecordCommand,
    requests_for: RequestFinder,
) -> anyhow::Result<()> {
    match cmd {
        RecordCommand::Add(args) => add_record::<C>(store, &args),
        RecordCommand::List { json } => list_records::<C>(store, json),
        RecordCommand::Show { id } => show_record::<C>(store, &id),
        RecordCommand::Status { id, status } => set_status::<C>(store, &id, &status),
        RecordCommand::Delete { id } => delete_record::<C>(store, &id),
        RecordCommand::Requests { id, json } => {
            let requests = requests_for(store, &id)
                .ok_or_else(|| anyhow!("no {} record with id {id}", C::LABEL))?;
            print_requests(&requests, json)
        }
    }
}

fn print_requests(requests: &[EmergencyRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(requests)?);
        return Ok(());
    }
    if requests.is_empty() {
        println!("No {} found.", Emergencies::LABEL);
        return Ok(());
    }

    println!("{:<36}  {:<9}  {:<5}  HOSPITAL", "ID", "STATUS", "TYPE");
    for request in requests {
        println!(
            "{:<36}  {:<9}  {:<5}  {}",
            request.id,
            request.status.as_str(),
            request.str_field("bloodType").unwrap_or("-"),
            request.str_field("hospitalName").unwrap_or("-")
        );
    }
    Ok(())
}

fn handle_emergency(store: &Store, config: &Config, cmd: EmergencyCommand) -> anyhow::Result<()> {
    match cmd {
        EmergencyCommand::Add(args) => add_record::<Emergencies>(store, &args),
        EmergencyCommand::List { json } => list_records::<Emergencies>(store, json),
        EmergencyCommand::Show { id } => show_record::<Emergencies>(store, &id),
        EmergencyCommand::Status { id, status } => set_status::<Emergencies>(store, &id, &status),
        EmergencyCommand::Delete { id } => delete_record::<Emergencies>(store, &id),
        EmergencyCommand::Matches {
            id,
            radius_km,
            json,
        } => handle_matches(store, config, &id, radius_km, json),
    }
}

fn add_record<C: Collection>(store: &Store, args: &FieldArgs) -> anyhow::Result<()> {
    let fields = args.to_fields()?;
    let record = store.collection::<C>().add(fields)?;
    println!("{}", record.id);
    Ok(())
}

fn list_records<C: Collection>(store: &Store, json: bool) -> anyhow::Result<()> {
    let records = store.collection::<C>().get_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No {} found.", C::LABEL);
        return Ok(());
    }

    println!("{:<36}  {:<9}  {:<16}  NAME", "ID", "STATUS", "CREATED");
    for record in &records {
        print_row(record);
    }
    Ok(())
}

fn print_row<S: Status>(record: &Record<S>) {
    println!(
        "{:<36}  {:<9}  {:<16}  {}",
        record.id,
        record.status.as_str(),
        record
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        record.display_name()
    );
}

fn show_record<C: Collection>(store: &Store, id: &str) -> anyhow::Result<()> {
    let record = store
        .collection::<C>()
        .get(id)
        .ok_or_else(|| anyhow!("no {} record with id {id}", C::LABEL))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn set_status<C: Collection>(store: &Store, id: &str, raw: &str) -> anyhow::Result<()> {
    let status: C::Status = raw.parse()?;
    if !store.collection::<C>().update_status(id, status)? {
        bail!("no {} record with id {id}", C::LABEL);
    }
    println!("{id}: {status}");
    Ok(())
}

fn delete_record<C: Collection>(store: &Store, id: &str) -> anyhow::Result<()> {
    if !store.collection::<C>().delete(id)? {
        bail!("no {} record with id {id}", C::LABEL);
    }
    println!("Deleted {id}");
    Ok(())
}

fn handle_matches(
    store: &Store,
    config: &Config,
    id: &str,
    radius_km: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let radius_km = radius_km.unwrap_or(config.matching.radius_km);
    if !radius_km.is_finite() || radius_km <= 0.0 {
        bail!("radius must be a positive number of kilometres, got {radius_km}");
    }
    if store.emergencies().get(id).is_none() {
        bail!("no {} record with id {id}", Emergencies::LABEL);
    }

    let matches = store.matching_donors(id, radius_km, Local::now().date_naive());

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }
    if matches.is_empty() {
        println!("No eligible donors within {radius_km} km.");
        return Ok(());
    }

    println!("{:>9}  {:<5}  {:<24}  PHONE", "DISTANCE", "GROUP", "NAME");
    for m in &matches {
        println!(
            "{:>6.2} km  {:<5}  {:<24}  {}",
            m.distance_km,
            m.donor.str_field("bloodGroup").unwrap_or("-"),
            m.donor.display_name(),
            m.donor.str_field("phone").unwrap_or("-")
        );
    }
    Ok(())
}

fn handle_stats(store: &Store, json: bool) -> anyhow::Result<()> {
    let stats = store.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("BloodBridge records");
    println!("===================");
    println!();
    println!("[Donors]");
    println!("  Total:     {}", stats.total_donors);
    println!("  Approved:  {}", stats.approved_donors);
    println!("  Pending:   {}", stats.pending_donors);
    println!("  Rejected:  {}", stats.rejected_donors);
    println!();
    println!("[Staff]");
    println!("  Total:     {}", stats.total_staff);
    println!("  Approved:  {}", stats.approved_staff);
    println!("  Pending:   {}", stats.pending_staff);
    println!("  Rejected:  {}", stats.rejected_staff);
    println!();
    println!("[Emergency requests]");
    println!("  Total:     {}", stats.total_emergency);
    println!("  Active:    {}", stats.active_emergency);
    println!("  Resolved:  {}", stats.resolved_emergency);
    Ok(())
}

fn handle_export(store: &Store, output: Option<PathBuf>) -> anyhow::Result<()> {
    let json = store.export_json()?;
    match output {
        Some(path) => {
            std::fs::write(&path, json.as_bytes())
                .with_context(|| format!("writing export to {}", path.display()))?;
            eprintln!("Exported records to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn handle_hospitals(config: &Config, cmd: &HospitalsCommand) -> anyhow::Result<()> {
    let mut options = config.locator_options();
    if let Some(radius_m) = cmd.radius_m {
        if radius_m == 0 {
            bail!("radius must be greater than 0");
        }
        options.radius_m = radius_m;
    }
    if let Some(limit) = cmd.limit {
        if limit == 0 {
            bail!("limit must be greater than 0");
        }
        options.max_results = limit;
    }

    let origin = match (cmd.lat, cmd.lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
        _ => config.locator.default_location,
    };

    let user_agent = &config.locator.user_agent;
    let source = OverpassSource::new(config.overpass_endpoint()?, options.request_timeout, user_agent)?;
    let geocoder =
        NominatimGeocoder::new(config.nominatim_endpoint()?, options.request_timeout, user_agent)?;
    let radius_m = options.radius_m;
    let locator = HospitalLocator::new(source, geocoder, options);

    let hospitals = locator.search(&FixedLocation::from(origin)).await?;

    if let Some(n) = cmd.select {
        let hospital = n
            .checked_sub(1)
            .and_then(|index| hospitals.get(index))
            .ok_or_else(|| anyhow!("no hospital number {n}; {} found", hospitals.len()))?;
        return print_selection(hospital, cmd.json);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&hospitals)?);
        return Ok(());
    }
    if hospitals.is_empty() {
        println!("No hospitals found within {radius_m} m.");
        return Ok(());
    }
    if cmd.html {
        for hospital in &hospitals {
            println!("{}", render_popup_html(hospital));
        }
        return Ok(());
    }

    for (i, hospital) in hospitals.iter().enumerate() {
        println!("{:>2}. {} ({:.2} km)", i + 1, hospital.name, hospital.distance_km);
        println!("    {}", hospital.address);
    }
    Ok(())
}

fn print_selection(hospital: &Hospital, json: bool) -> anyhow::Result<()> {
    let selection = HospitalSelection::select(hospital);

    if json {
        let fields = selection.clone().into_fields();
        let document = serde_json::json!({ "selection": selection, "fields": fields });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("Selected:  {}", selection.name);
    println!("Address:   {}", selection.address);
    println!("Map:       {}", selection.maps_link);
    println!();
    println!("Record fields:");
    for (key, value) in selection.into_fields() {
        println!("  --field {key}={}", value.as_str().map_or_else(|| value.to_string(), str::to_string));
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file.clone())?,
    }
    Ok(())
}

fn print_config(config: &Config) {
    let locator = &config.locator;

    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Storage]");
    println!("  Backend:            {}", config.storage.backend);
    println!("  Database path:      {}", config.database_path().display());
    println!();
    println!("[Locator]");
    println!("  Overpass URL:       {}", locator.overpass_url);
    println!("  Nominatim URL:      {}", locator.nominatim_url);
    println!("  User agent:         {}", locator.user_agent);
    println!("  Radius (m):         {}", locator.radius_m);
    println!("  Max results:        {}", locator.max_results);
    println!("  Request timeout:    {} ms", locator.request_timeout_ms);
    println!("  Address deadline:   {} ms", locator.enrichment_deadline_ms);
    println!("  Max retries:        {}", locator.max_retries);
    match locator.default_location {
        Some(location) => println!("  Default location:   {location}"),
        None => println!("  Default location:   (none)"),
    }
    println!();
    println!("[Matching]");
    println!("  Radius (km):        {}", config.matching.radius_km);
}

fn handle_validate(file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => {
            println!("Configuration is valid.");
            Ok(())
        }
        Err(e) => Err(e).context("configuration is invalid"),
    }
}
