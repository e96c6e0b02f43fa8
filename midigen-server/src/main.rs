use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};

use log::{info, warn, LevelFilter};
use serde::Deserialize;
use simple_logger::SimpleLogger;

use midigen_core::model::generator::MidiGenerator;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	/// Comma-separated source file names; every file in the data
	/// directory when omitted
	sources: Option<String>,
	iterations: Option<usize>,
}

struct Config {
	data_dir: PathBuf,
}

/// Lists the `.mid` files directly contained in the data directory,
/// sorted by name.
fn list_sources(data_dir: &Path) -> std::io::Result<Vec<String>> {
	let mut names = Vec::new();
	for entry in fs::read_dir(data_dir)? {
		let path = entry?.path();
		if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("mid")) {
			if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
				names.push(name.to_owned());
			}
		}
	}
	names.sort();
	Ok(names)
}

/// HTTP GET endpoint `/v1/sources`
///
/// Returns the names of the available source files, one per line.
#[get("/v1/sources")]
async fn get_sources(config: web::Data<Config>) -> impl Responder {
	match list_sources(&config.data_dir) {
		Ok(names) => HttpResponse::Ok().body(names.join("\n")),
		Err(error) => {
			HttpResponse::InternalServerError().body(format!("Failed to list sources: {error}"))
		}
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Builds a fresh model from the requested sources and responds with a
/// newly generated MIDI file. Unreadable or malformed sources are skipped;
/// the request only fails when nothing usable remains.
#[get("/v1/generate")]
async fn get_generated(
	config: web::Data<Config>,
	query: web::Query<GenerateParams>,
) -> impl Responder {
	let iterations = query.iterations.unwrap_or(1000);

	let names: Vec<String> = match &query.sources {
		Some(list) => list
			.split(',')
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.map(str::to_owned)
			.collect(),
		None => match list_sources(&config.data_dir) {
			Ok(all) => all,
			Err(error) => {
				return HttpResponse::InternalServerError()
					.body(format!("Failed to list sources: {error}"));
			}
		},
	};

	if names.is_empty() {
		return HttpResponse::BadRequest().body("No source file requested or available");
	}

	let mut sources = Vec::new();
	for name in names {
		match File::open(config.data_dir.join(&name)) {
			Ok(file) => sources.push((name, file)),
			Err(error) => warn!("skipping {name}: {error}"),
		}
	}

	// A model is built per request, as generation is cheap next to keeping
	// every combination of sources resident
	let mut generator = MidiGenerator::new();
	generator.ingest_all(sources);

	if generator.graph().is_empty() {
		return HttpResponse::InternalServerError()
			.body("No usable source, nothing to generate from");
	}

	let mut data = Vec::new();
	match generator.write_smf(&mut data, iterations) {
		Ok(generation) => {
			info!(
				"generated {} events over {} states",
				generation.events.len(),
				generator.graph().state_count()
			);
			HttpResponse::Ok().content_type("audio/midi").body(data)
		}
		Err(error) => {
			HttpResponse::InternalServerError().body(format!("Generation failed: {error}"))
		}
	}
}

/// Main entry point for the server.
///
/// Reads the data directory from `MIDIGEN_DATA_DIR` (default `./data`) and
/// starts an Actix-web HTTP server exposing the source list and generation
/// endpoints.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	SimpleLogger::new()
		.with_level(LevelFilter::Info)
		.env()
		.init()
		.map_err(std::io::Error::other)?;

	let data_dir = PathBuf::from(env::var("MIDIGEN_DATA_DIR").unwrap_or_else(|_| "./data".to_owned()));
	info!("serving MIDI sources from {}", data_dir.display());
	let config = web::Data::new(Config { data_dir });

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(config.clone())
			.service(get_sources)
			.service(get_generated)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
