//! CareBook operations CLI
//!
//! Drives the booking core end to end against fixture reference data:
//! search (online or simulated-offline), slot listing, booking, history,
//! cancellation and reschedule, plus a scripted walkthrough of the
//! confirmation sheet and biometric scan primitives.

mod fixtures;

use anyhow::{anyhow, bail, Result};
use booking_engine::{
    week_start_for, AlwaysAvailable, AppointmentSlot, AvailabilityOracle, BookingEngine,
    BookingError, ConnectivityMonitor, Doctor, PatientProfile, RandomContention,
    ReferenceDirectory, ResultsCachePayload, SearchFilters, SearchOutcome, SearchQuery, SortKey,
    SystemClock,
};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use overlay_sheet::{
    BiometricScan, MemoryHost, OverlayConfig, OverlayController, OverlayKey, ScanConfig,
    ScanEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use storage_kv::{FallbackStore, FileStore, KeyValueStore};
use tracing_subscriber::EnvFilter;

/// CareBook appointment booking core, driven from the terminal
#[derive(Parser, Debug)]
#[command(name = "carebook")]
#[command(about = "Search doctors, book and reschedule appointments against fixture data")]
struct Args {
    /// Directory holding the persisted state document
    #[arg(long, default_value = ".carebook")]
    data_dir: PathBuf,

    /// Simulate loss of connectivity: search serves from the results cache
    #[arg(long)]
    offline: bool,

    /// Act as the private-insurance demo patient instead of the public one
    #[arg(long)]
    private: bool,

    /// Probability [0..1] that confirmation hits simulated slot contention
    #[arg(long, default_value = "0.0")]
    contention: f64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search doctors for the current week
    Search {
        /// Specialty query; empty matches every specialty
        #[arg(default_value = "")]
        query: String,

        /// City query; empty matches every city
        #[arg(long, default_value = "")]
        city: String,

        /// Only doctors accepting public insurance (public patients only)
        #[arg(long)]
        public_only: bool,

        /// Only doctors offering video visits
        #[arg(long)]
        video_only: bool,

        /// Distance radius in kilometres
        #[arg(long)]
        radius: Option<f64>,

        /// Minimum rating (0-5)
        #[arg(long)]
        min_rating: Option<f32>,

        /// Sort order: soonest, distance or rating
        #[arg(long)]
        sort: Option<String>,

        /// Reset all filters to their defaults first
        #[arg(long)]
        clear_filters: bool,
    },

    /// List this week's slots for a doctor from the last search
    Slots {
        /// Doctor number from the last search output
        doctor: usize,
    },

    /// Book a slot; numbers refer to the last search output
    Book {
        doctor: usize,
        slot: usize,

        /// Free-text reason shown to the practice
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show booking history with derived statuses
    History,

    /// Cancel a booking; requires the explicit --yes confirmation
    Cancel {
        /// Booking number from the history output
        booking: usize,

        /// Confirm the cancellation (it cannot be undone)
        #[arg(long)]
        yes: bool,
    },

    /// Move a booking onto a new slot
    Reschedule {
        /// Booking number from the history output
        booking: usize,
        doctor: usize,
        slot: usize,
    },

    /// Scripted walkthrough of the confirmation sheet and biometric scan
    Demo,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let engine = build_engine(&args)?;
    let patient = if args.private {
        fixtures::private_patient()
    } else {
        fixtures::public_patient()
    };
    let week = week_start_for(Utc::now().date_naive());

    match args.command {
        Command::Search {
            ref query,
            ref city,
            public_only,
            video_only,
            radius,
            min_rating,
            ref sort,
            clear_filters,
        } => {
            let mut filters = engine.search().load_filters();
            if clear_filters {
                filters.clear();
            }
            filters.public_only = filters.public_only || public_only;
            filters.video_only = filters.video_only || video_only;
            if let Some(radius) = radius {
                filters.radius_km = radius;
            }
            if let Some(min_rating) = min_rating {
                filters.min_rating = min_rating;
            }
            if let Some(sort) = sort {
                filters.sort = parse_sort(sort)?;
            }
            engine.search().persist_filters(&filters)?;

            let search_query = SearchQuery {
                specialty: query.clone(),
                city: city.clone(),
            };
            engine.search().persist_query(&search_query)?;

            // The browser would feed this from its connectivity events; the
            // CLI seeds it from the --offline flag.
            let connectivity = ConnectivityMonitor::new(!args.offline);
            connectivity.on_change(|online| {
                tracing::info!(online, "Connectivity changed mid-session");
            });

            run_search(
                &engine,
                &search_query,
                &patient,
                &filters,
                connectivity.is_online(),
                week,
            )
        }
        Command::Slots { doctor } => run_slots(&engine, doctor),
        Command::Book {
            doctor,
            slot,
            reason,
        } => run_book(&engine, &patient, doctor, slot, reason),
        Command::History => run_history(&engine, &patient),
        Command::Cancel { booking, yes } => run_cancel(&engine, &patient, booking, yes),
        Command::Reschedule {
            booking,
            doctor,
            slot,
        } => run_reschedule(&engine, &patient, booking, doctor, slot),
        Command::Demo => run_demo(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn build_engine(args: &Args) -> Result<BookingEngine> {
    std::fs::create_dir_all(&args.data_dir)?;
    let file = FileStore::open(args.data_dir.join("carebook.json"))?;
    tracing::debug!(data_dir = %args.data_dir.display(), "State document opened");
    let store: Arc<dyn KeyValueStore> = Arc::new(FallbackStore::new(Box::new(file)));

    let oracle: Box<dyn AvailabilityOracle> = if args.contention > 0.0 {
        Box::new(RandomContention {
            rate: args.contention.min(1.0),
        })
    } else {
        Box::new(AlwaysAvailable)
    };

    Ok(BookingEngine::new(
        store,
        Arc::new(fixtures::directory()),
        Arc::new(SystemClock),
        oracle,
    ))
}

fn parse_sort(raw: &str) -> Result<SortKey> {
    match raw {
        "soonest" => Ok(SortKey::Soonest),
        "distance" => Ok(SortKey::Distance),
        "rating" => Ok(SortKey::Rating),
        other => bail!("unknown sort key '{}': use soonest, distance or rating", other),
    }
}

fn run_search(
    engine: &BookingEngine,
    query: &SearchQuery,
    patient: &PatientProfile,
    filters: &SearchFilters,
    online: bool,
    week: NaiveDate,
) -> Result<()> {
    match engine.search().search(query, patient, filters, online, week) {
        SearchOutcome::Fresh {
            visible,
            blocked_by_insurance,
            ..
        } => {
            print_doctors(&visible);
            if !blocked_by_insurance.is_empty() {
                println!(
                    "\n{} doctor(s) hidden because they do not accept public insurance:",
                    blocked_by_insurance.len()
                );
                for doctor in &blocked_by_insurance {
                    println!("  - {} ({})", doctor.name, doctor.specialty);
                }
            }
        }
        SearchOutcome::Cached { visible, .. } => {
            println!("(offline: showing cached results)\n");
            print_doctors(&visible);
        }
        SearchOutcome::Unavailable => {
            println!("Offline and no recent results are cached for this week.");
            println!("Reconnect and search again to refresh availability.");
        }
    }
    Ok(())
}

fn print_doctors(doctors: &[Doctor]) {
    if doctors.is_empty() {
        println!("No doctors match the current search.");
        return;
    }
    for (index, doctor) in doctors.iter().enumerate() {
        println!(
            "{:>2}. {:<22} {:<18} {:>4.1} km  {:.1}★{}",
            index + 1,
            doctor.name,
            doctor.specialty,
            doctor.distance_km,
            doctor.rating,
            if doctor.offers_video { "  video" } else { "" },
        );
    }
}

fn cached_results(engine: &BookingEngine) -> Result<ResultsCachePayload> {
    engine
        .search()
        .cache()
        .read()
        .ok_or_else(|| anyhow!("no recent search results; run `carebook search` first"))
}

fn resolve_doctor(results: &ResultsCachePayload, number: usize) -> Result<Doctor> {
    let id = results
        .visible_doctors
        .get(number.checked_sub(1).ok_or_else(|| anyhow!("doctor numbers start at 1"))?)
        .ok_or_else(|| anyhow!("no doctor {} in the last search", number))?;
    fixtures::directory()
        .doctor(*id)
        .ok_or_else(|| anyhow!("doctor {} is no longer in the directory", number))
}

fn resolve_slot(
    results: &ResultsCachePayload,
    doctor: &Doctor,
    number: usize,
) -> Result<AppointmentSlot> {
    let slots = results
        .slots_by_doctor
        .get(&doctor.id)
        .ok_or_else(|| anyhow!("no slot data cached for {}", doctor.name))?;
    slots
        .get(number.checked_sub(1).ok_or_else(|| anyhow!("slot numbers start at 1"))?)
        .cloned()
        .ok_or_else(|| anyhow!("{} has no slot {} this week", doctor.name, number))
}

fn run_slots(engine: &BookingEngine, doctor_number: usize) -> Result<()> {
    let results = cached_results(engine)?;
    let doctor = resolve_doctor(&results, doctor_number)?;
    let slots = results
        .slots_by_doctor
        .get(&doctor.id)
        .ok_or_else(|| anyhow!("no slot data cached for {}", doctor.name))?;

    println!("Slots for {} (week of {}):", doctor.name, results.week_start);
    for (index, slot) in slots.iter().enumerate() {
        println!(
            "{:>2}. {}  ({} min)",
            index + 1,
            slot.start.format("%a %H:%M"),
            slot.length.minutes(),
        );
    }
    Ok(())
}

fn run_book(
    engine: &BookingEngine,
    patient: &PatientProfile,
    doctor_number: usize,
    slot_number: usize,
    reason: Option<String>,
) -> Result<()> {
    let results = cached_results(engine)?;
    let doctor = resolve_doctor(&results, doctor_number)?;
    let slot = resolve_slot(&results, &doctor, slot_number)?;

    // Drop any marker left behind by an abandoned flow so a plain booking
    // can never silently turn into a reschedule.
    engine.confirmation().clear_selection();
    engine.confirmation().select_slot(slot.clone())?;
    match engine.confirmation().confirm(patient, reason) {
        Ok(booking) => {
            println!(
                "Booked {} on {} — confirmation code {}",
                doctor.name,
                slot.start.format("%a %d %b, %H:%M"),
                booking.confirmation_code,
            );
            Ok(())
        }
        Err(BookingError::SlotUnavailable) => {
            bail!("that slot is no longer available — pick another one and retry")
        }
        Err(err) => Err(err.into()),
    }
}

fn run_history(engine: &BookingEngine, patient: &PatientProfile) -> Result<()> {
    let bookings = engine.bookings().list_for_patient(patient.id);
    if bookings.is_empty() {
        println!("No appointments yet.");
        return Ok(());
    }

    for (index, booking) in bookings.iter().enumerate() {
        let doctor_name = fixtures::directory()
            .doctor(booking.doctor_id)
            .map(|d| d.name)
            .unwrap_or_else(|| "Unknown doctor".to_string());
        println!(
            "{:>2}. {}  {}  {:?}  {}{}",
            index + 1,
            booking.slot.start.format("%a %d %b %H:%M"),
            doctor_name,
            booking.status,
            booking.confirmation_code,
            booking
                .replaces_booking_id
                .map(|_| "  (rescheduled)")
                .unwrap_or(""),
        );
    }
    Ok(())
}

fn nth_booking(
    engine: &BookingEngine,
    patient: &PatientProfile,
    number: usize,
) -> Result<booking_engine::Booking> {
    let bookings = engine.bookings().list_for_patient(patient.id);
    bookings
        .get(number.checked_sub(1).ok_or_else(|| anyhow!("booking numbers start at 1"))?)
        .cloned()
        .ok_or_else(|| anyhow!("no booking {} in your history", number))
}

fn run_cancel(
    engine: &BookingEngine,
    patient: &PatientProfile,
    booking_number: usize,
    yes: bool,
) -> Result<()> {
    let booking = nth_booking(engine, patient, booking_number)?;
    if !yes {
        bail!(
            "cancelling appointment {} cannot be undone; re-run with --yes to confirm",
            booking.confirmation_code
        );
    }

    engine.confirmation().cancel(booking.id)?;
    println!("Appointment {} cancelled.", booking.confirmation_code);
    Ok(())
}

fn run_reschedule(
    engine: &BookingEngine,
    patient: &PatientProfile,
    booking_number: usize,
    doctor_number: usize,
    slot_number: usize,
) -> Result<()> {
    let booking = nth_booking(engine, patient, booking_number)?;
    let results = cached_results(engine)?;
    let doctor = resolve_doctor(&results, doctor_number)?;
    let slot = resolve_slot(&results, &doctor, slot_number)?;

    engine.confirmation().clear_selection();
    engine.confirmation().stage_reschedule(booking.id)?;
    engine.confirmation().select_slot(slot.clone())?;
    match engine.confirmation().confirm(patient, booking.reason.clone()) {
        Ok(replacement) => {
            println!(
                "Moved to {} on {} — new confirmation code {} (previous appointment cancelled)",
                doctor.name,
                slot.start.format("%a %d %b, %H:%M"),
                replacement.confirmation_code,
            );
            Ok(())
        }
        Err(BookingError::SlotUnavailable) => {
            engine.confirmation().clear_selection();
            bail!("that slot is no longer available — your original appointment is unchanged")
        }
        Err(err) => Err(err.into()),
    }
}

/// Scripted tour of the sheet primitive: open, trap focus, run a blocking
/// biometric scan, then close with a staged exit.
fn run_demo() -> Result<()> {
    let mut now = Utc::now();

    let mut host = MemoryHost::new(vec![
        "reason-field".to_string(),
        "confirm-button".to_string(),
        "cancel-button".to_string(),
    ]);
    host.focused = Some("book-button".to_string());

    let mut sheet = OverlayController::new(host, OverlayConfig::sheet());
    sheet.set_open(true, now);
    println!("sheet opened: focus -> {:?}", sheet.host().focused);

    now += Duration::milliseconds(150);
    sheet.tick(now);

    sheet.handle_key(OverlayKey::Tab { shift: false }, now);
    sheet.handle_key(OverlayKey::Tab { shift: false }, now);
    sheet.handle_key(OverlayKey::Tab { shift: false }, now);
    println!("tab wrapped back to: {:?}", sheet.host().focused);

    let mut scan = BiometricScan::new(ScanConfig::default());
    scan.start(true, now);
    sheet.set_blocking(true);
    sheet.handle_key(OverlayKey::Escape, now);
    println!(
        "scan in flight; escape is suppressed (sheet still open: {})",
        sheet.is_open()
    );

    loop {
        now += Duration::milliseconds(400);
        match scan.tick(now) {
            Some(ScanEvent::Succeeded) => {
                println!("scan verified, holding result");
                sheet.set_blocking(false);
            }
            Some(ScanEvent::Failed) => {
                println!("scan failed");
                sheet.set_blocking(false);
                break;
            }
            Some(ScanEvent::Finished) => {
                println!("scan flow finished");
                break;
            }
            None => {}
        }
    }

    sheet.set_open(false, now);
    println!(
        "sheet closing (mounted: {}), focus restored -> {:?}",
        sheet.is_mounted(),
        sheet.host().focused
    );

    now += Duration::milliseconds(200);
    sheet.tick(now);
    println!("sheet unmounted: {}", !sheet.is_mounted());

    Ok(())
}
