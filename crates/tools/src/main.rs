use std::path::PathBuf;

use catalog::Catalog;
use clap::{Parser, Subcommand};
use explorer::{
    Explorer, ExplorerConfig, HeadlessMap, HostRequest, MapBackend, PanelState, RegionFilter,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the map explorer headlessly")]
struct Args {
    /// Country catalog JSON (default: bundled sample)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Explorer config JSON (default: built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search names and capitals, ignoring accents and case
    Search {
        query: String,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Compute where the camera flies to show a country's popup
    Center {
        id: String,

        /// Starting zoom
        #[arg(long)]
        zoom: Option<f64>,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        height: Option<f64>,

        /// Use a phone-sized viewport unless width/height are given
        #[arg(long)]
        mobile: bool,

        /// Desktop sidebar open
        #[arg(long)]
        sidebar: bool,

        /// Mobile bottom sheet open
        #[arg(long)]
        bottom_sheet: bool,
    },

    /// Pick random visible countries
    Random {
        /// Region filter: All, Africa, Americas, Asia, Europe, Oceania
        #[arg(long, default_value = "All")]
        region: String,

        #[arg(long)]
        no_territories: bool,

        #[arg(long)]
        no_de_facto: bool,

        #[arg(long, default_value_t = 1)]
        count: u32,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replay URL query strings and report the resulting selections
    Link {
        #[arg(required = true)]
        queries: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args = Args::parse();

    let catalog = match &args.catalog {
        Some(path) => Catalog::from_path(path).map_err(|e| e.to_string())?,
        None => Catalog::builtin().map_err(|e| e.to_string())?,
    };
    let config = match &args.config {
        Some(path) => ExplorerConfig::from_path(path).map_err(|e| e.to_string())?,
        None => ExplorerConfig::default(),
    };
    info!(records = catalog.len(), "catalog loaded");

    match args.command {
        Command::Search { query, limit } => cmd_search(catalog, config, &query, limit),
        Command::Center {
            id,
            zoom,
            width,
            height,
            mobile,
            sidebar,
            bottom_sheet,
        } => {
            let (default_w, default_h) = if mobile { (390.0, 844.0) } else { (1280.0, 800.0) };
            let view = CenterView {
                zoom,
                width: width.unwrap_or(default_w),
                height: height.unwrap_or(default_h),
                panels: PanelState {
                    sidebar_open: sidebar,
                    bottom_sheet_open: bottom_sheet,
                },
            };
            cmd_center(catalog, config, &id, view)
        }
        Command::Random {
            region,
            no_territories,
            no_de_facto,
            count,
            seed,
        } => {
            let region = region
                .parse::<RegionFilter>()
                .map_err(|e| e.to_string())?;
            let mut config = config;
            if seed.is_some() {
                config.rng_seed = seed;
            }
            cmd_random(catalog, config, region, !no_territories, !no_de_facto, count)
        }
        Command::Link { queries } => cmd_link(catalog, config, &queries),
    }
}

fn mounted(catalog: Catalog, config: ExplorerConfig) -> Result<Explorer<HeadlessMap>, String> {
    let mut ex = Explorer::new(config, catalog, |opts, size| Ok(HeadlessMap::new(opts, size)));
    ex.mount();
    ex.flush();
    if ex.map().is_none() {
        return Err(format!("map did not initialize ({:?})", ex.lifecycle()));
    }
    Ok(ex)
}

/// Long enough for any pending selection to reach its popup.
fn settle_window(config: &ExplorerConfig) -> u64 {
    config.settle.safety_timeout_ms + config.settle.deep_link_extra_delay_ms
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let payload = serde_json::to_string_pretty(value).map_err(|e| format!("json: {e}"))?;
    println!("{payload}");
    Ok(())
}

fn popup_country(ex: &Explorer<HeadlessMap>) -> Option<String> {
    let handle = ex.map()?.open_popup_marker()?;
    let idx = ex.registry().index_of(handle)?;
    ex.registry().entry(idx).map(|e| e.country_id.clone())
}

#[derive(Debug, Serialize)]
struct SearchHit {
    id: String,
    name: String,
    capital: String,
    region: String,
}

fn cmd_search(
    catalog: Catalog,
    mut config: ExplorerConfig,
    query: &str,
    limit: Option<usize>,
) -> Result<(), String> {
    if let Some(limit) = limit {
        config.search_limit = limit;
    }
    let mut ex: Explorer<HeadlessMap> =
        Explorer::new(config, catalog, |opts, size| Ok(HeadlessMap::new(opts, size)));
    ex.set_query(query);
    let hits: Vec<SearchHit> = ex
        .search_rows()
        .into_iter()
        .map(|row| SearchHit {
            id: row.record.id.clone(),
            name: row.record.name.clone(),
            capital: row.record.capital.clone(),
            region: row.record.region.to_string(),
        })
        .collect();
    print_json(&hits)
}

#[derive(Debug)]
struct CenterView {
    zoom: Option<f64>,
    width: f64,
    height: f64,
    panels: PanelState,
}

#[derive(Debug, Serialize)]
struct CenterReport {
    id: String,
    device: String,
    marker: [f64; 2],
    longitude_offset: f64,
    center: [f64; 2],
    zoom: f64,
    screen_point: [f64; 2],
    popup_opened: bool,
}

fn cmd_center(
    catalog: Catalog,
    config: ExplorerConfig,
    id: &str,
    view: CenterView,
) -> Result<(), String> {
    if catalog.get(id).is_none() {
        return Err(format!("unknown country id: {id}"));
    }
    let window = settle_window(&config);
    let mut ex = mounted(catalog, config)?;
    ex.set_viewport(view.width, view.height);
    ex.set_panels(view.panels);
    if let (Some(zoom), Some(map)) = (view.zoom, ex.map_mut()) {
        let center = map.center();
        map.jump_to(center, zoom);
    }

    if !ex.select_country(id) {
        return Err(format!("{id} has no marker on the map"));
    }
    let sel = ex
        .active_selection()
        .cloned()
        .ok_or_else(|| "selection did not start".to_string())?;
    let entry = ex
        .registry()
        .entry(sel.entry)
        .cloned()
        .ok_or_else(|| "selected marker vanished".to_string())?;

    if let Some(map) = ex.map_mut() {
        map.complete_flight();
    }
    ex.on_move_end();
    ex.advance(window);

    print_json(&CenterReport {
        id: id.to_string(),
        device: format!("{:?}", ex.device()),
        marker: [entry.position.lat, entry.position.lng],
        longitude_offset: entry.longitude_offset,
        center: [sel.target.center.lat, sel.target.center.lng],
        zoom: sel.target.zoom,
        screen_point: [sel.target.screen_point.x, sel.target.screen_point.y],
        popup_opened: popup_country(&ex).as_deref() == Some(id),
    })
}

#[derive(Debug, Serialize)]
struct RandomPick {
    id: String,
    name: String,
    region: String,
    kind: String,
}

fn cmd_random(
    catalog: Catalog,
    config: ExplorerConfig,
    region: RegionFilter,
    territories: bool,
    de_facto: bool,
    count: u32,
) -> Result<(), String> {
    let window = settle_window(&config);
    let mut ex = mounted(catalog, config)?;
    ex.set_region_filter(region);
    ex.set_territories_visible(territories);
    ex.set_de_facto_visible(de_facto);
    ex.flush();

    let mut picks = Vec::new();
    for _ in 0..count {
        let Some(id) = ex.pick_random() else {
            break;
        };
        ex.advance(window);
        if let Some(record) = ex.catalog().get(&id) {
            picks.push(RandomPick {
                id: record.id.clone(),
                name: record.name.clone(),
                region: record.region.to_string(),
                kind: format!("{:?}", record.kind),
            });
        }
    }
    if picks.is_empty() {
        return Err("no visible country to pick from".to_string());
    }
    print_json(&picks)
}

#[derive(Debug, Serialize)]
struct LinkStep {
    query: String,
    active: Option<String>,
    phase: &'static str,
    popup: Option<String>,
    region_filter: String,
    territories_visible: bool,
    de_facto_visible: bool,
    url_writes: Vec<Option<String>>,
}

fn cmd_link(catalog: Catalog, config: ExplorerConfig, queries: &[String]) -> Result<(), String> {
    let window = settle_window(&config);
    let mut ex = mounted(catalog, config)?;
    let mut steps = Vec::with_capacity(queries.len());
    for query in queries {
        ex.on_url_changed(query);
        ex.advance(window);
        let url_writes = ex
            .drain_requests()
            .into_iter()
            .filter_map(|r| match r {
                HostRequest::WriteCountryParam(v) => Some(v),
                HostRequest::NavigateToProfile(_) => None,
            })
            .collect();
        steps.push(LinkStep {
            query: query.clone(),
            active: ex.active_country_id().map(str::to_string),
            phase: ex.phase().name(),
            popup: popup_country(&ex),
            region_filter: ex.view().region_filter.to_string(),
            territories_visible: ex.view().territories_visible,
            de_facto_visible: ex.view().de_facto_visible,
            url_writes,
        });
    }
    print_json(&steps)
}
