use catalog::{Catalog, CountryKind, Region};
use explorer::{
    ChromeProfile, Explorer, ExplorerConfig, HeadlessMap, HostRequest, KeyOutcome, LONGITUDE_OFFSETS,
    Lifecycle, MapBackend, PanelState, RegionFilter, SearchKey, SelectionPhase, container_point,
    safe_zone,
};
use pretty_assertions::assert_eq;

fn config(seed: u64) -> ExplorerConfig {
    ExplorerConfig {
        rng_seed: Some(seed),
        ..ExplorerConfig::default()
    }
}

fn explorer_with(config: ExplorerConfig) -> Explorer<HeadlessMap> {
    Explorer::new(config, Catalog::builtin().unwrap(), |opts, size| {
        Ok(HeadlessMap::new(opts, size))
    })
}

fn mounted() -> Explorer<HeadlessMap> {
    let mut ex = explorer_with(config(3));
    ex.mount();
    ex.flush();
    ex
}

fn map(ex: &Explorer<HeadlessMap>) -> &HeadlessMap {
    ex.map().unwrap()
}

fn land(ex: &mut Explorer<HeadlessMap>) {
    assert!(ex.map_mut().unwrap().complete_flight());
}

fn popup_country(ex: &Explorer<HeadlessMap>) -> Option<String> {
    let handle = map(ex).open_popup_marker()?;
    let idx = ex.registry().index_of(handle)?;
    Some(ex.registry().entry(idx)?.country_id.clone())
}

fn assert_attachment_matches_view(ex: &Explorer<HeadlessMap>) {
    for entry in ex.registry().entries() {
        assert_eq!(
            map(ex).is_attached(entry.handle),
            ex.view().admits_entry(entry),
            "{} at offset {}",
            entry.country_id,
            entry.longitude_offset
        );
    }
}

#[test]
fn three_copies_per_record_survive_filter_changes() {
    let mut ex = mounted();
    let created = map(&ex).markers_created();
    assert_eq!(created, ex.catalog().len() * 3);

    for record in ex.catalog().records() {
        let offsets: Vec<f64> = ex
            .registry()
            .copies_of(&record.id)
            .iter()
            .map(|&i| ex.registry().entry(i).unwrap().longitude_offset)
            .collect();
        assert_eq!(offsets, LONGITUDE_OFFSETS.to_vec());
    }

    let initial: Vec<bool> = ex
        .registry()
        .entries()
        .iter()
        .map(|e| map(&ex).is_attached(e.handle))
        .collect();

    ex.set_region_filter(RegionFilter::Region(Region::Africa));
    ex.set_territories_visible(false);
    ex.flush();
    assert_attachment_matches_view(&ex);

    ex.set_de_facto_visible(false);
    ex.set_region_filter(RegionFilter::Region(Region::Oceania));
    ex.flush();
    assert_attachment_matches_view(&ex);

    ex.set_region_filter(RegionFilter::All);
    ex.set_territories_visible(true);
    ex.set_de_facto_visible(true);
    ex.flush();
    let restored: Vec<bool> = ex
        .registry()
        .entries()
        .iter()
        .map(|e| map(&ex).is_attached(e.handle))
        .collect();
    assert_eq!(restored, initial);
    assert_eq!(map(&ex).markers_created(), created);
}

#[test]
fn filter_changes_in_one_turn_cost_one_render_pass() {
    let mut ex = mounted();
    let before = map(&ex).render_passes();
    ex.set_region_filter(RegionFilter::Region(Region::Asia));
    ex.set_territories_visible(false);
    ex.set_de_facto_visible(false);
    ex.flush();
    assert_eq!(map(&ex).render_passes(), before + 1);
}

#[test]
fn hiding_the_active_country_clears_it() {
    let mut ex = mounted();
    assert!(ex.select_country("gi"));
    land(&mut ex);
    ex.advance(900);
    assert_eq!(popup_country(&ex).as_deref(), Some("gi"));
    ex.drain_requests();

    ex.set_territories_visible(false);
    ex.flush();
    assert_eq!(ex.active_country_id(), None);
    assert_eq!(ex.phase(), &SelectionPhase::Idle);
    assert_eq!(map(&ex).open_popup_marker(), None);
    assert_eq!(ex.drain_requests(), vec![HostRequest::WriteCountryParam(None)]);
}

#[test]
fn region_change_keeping_active_visible_keeps_selection() {
    let mut ex = mounted();
    ex.select_country("fr");
    land(&mut ex);
    ex.advance(900);
    ex.set_region_filter(RegionFilter::Region(Region::Europe));
    ex.flush();
    assert_eq!(ex.active_country_id(), Some("fr"));
    assert_eq!(popup_country(&ex).as_deref(), Some("fr"));
}

#[test]
fn diacritic_insensitive_search_selects_and_clears_query() {
    let mut ex = mounted();
    ex.set_query("sao");
    let rows = ex.search_rows();
    assert!(rows.iter().any(|r| r.record.name == "São Tomé and Príncipe"));

    let outcome = ex.on_search_key(SearchKey::Enter);
    assert!(matches!(outcome, KeyOutcome::Select(_)));
    assert_eq!(ex.active_country_id(), Some("st"));
    assert_eq!(ex.search().query(), "");
    assert!(ex.search().results().is_empty());
    assert_eq!(
        ex.drain_requests(),
        vec![HostRequest::WriteCountryParam(Some("st".to_string()))]
    );
}

#[test]
fn search_selection_reveals_hidden_kind_and_region() {
    let mut ex = mounted();
    ex.set_region_filter(RegionFilter::Region(Region::Asia));
    ex.set_territories_visible(false);
    ex.flush();

    ex.set_query("gibral");
    assert!(ex.select_search_result(0));
    assert!(ex.view().territories_visible);
    assert_eq!(ex.view().region_filter, RegionFilter::All);
    assert_eq!(ex.active_country_id(), Some("gi"));

    ex.flush();
    assert_attachment_matches_view(&ex);
    ex.advance(1300);
    assert_eq!(popup_country(&ex).as_deref(), Some("gi"));
}

#[test]
fn search_keeps_matching_region_filter() {
    let mut ex = mounted();
    ex.set_region_filter(RegionFilter::Region(Region::Europe));
    ex.set_query("oslo");
    ex.on_search_key(SearchKey::ArrowDown);
    ex.on_search_key(SearchKey::Enter);
    assert_eq!(ex.active_country_id(), Some("no"));
    assert_eq!(ex.view().region_filter, RegionFilter::Region(Region::Europe));
}

#[test]
fn centering_lands_marker_on_safe_zone_target() {
    let mut cfg = config(1);
    cfg.chrome.desktop = ChromeProfile {
        top_bar_px: 100.0,
        sidebar_width_px: 0.0,
        bottom_sheet_px: 0.0,
    };
    let mut ex = explorer_with(cfg);
    ex.mount();
    ex.set_viewport(1280.0, 800.0);
    let start_zoom = map(&ex).zoom();

    ex.select_country("jp");
    let sel = ex.active_selection().unwrap().clone();
    assert!(sel.target.zoom >= start_zoom.max(5.5));

    land(&mut ex);
    let m = map(&ex);
    let entry = ex.registry().entry(sel.entry).unwrap();
    let at = container_point(m, entry.position, m.center(), m.zoom(), m.viewport_size());
    assert!(at.distance(sel.target.screen_point) < 1e-6);

    let zone = safe_zone(m.viewport_size(), &ex.chrome());
    assert!(zone.contains(at));
    assert_eq!(zone.top, 100.0);
    assert_eq!(sel.target.screen_point.x, 640.0);
    assert_eq!(sel.target.screen_point.y, 450.0 + 80.0);
}

#[test]
fn open_sidebar_shifts_target_right() {
    let mut ex = mounted();
    ex.set_panels(PanelState {
        sidebar_open: true,
        bottom_sheet_open: false,
    });
    ex.select_country("br");
    let target = ex.active_selection().unwrap().target;
    assert_eq!(target.screen_point.x, (380.0 + 1280.0) / 2.0);
}

#[test]
fn mobile_bottom_sheet_keeps_marker_above_it() {
    let mut ex = mounted();
    ex.set_viewport(390.0, 844.0);
    ex.set_panels(PanelState {
        sidebar_open: false,
        bottom_sheet_open: true,
    });
    ex.select_country("ke");
    let sel = ex.active_selection().unwrap().clone();
    assert!(sel.target.zoom >= 4.5);
    assert!(sel.target.screen_point.y <= 844.0 - 260.0);
}

#[test]
fn settle_check_opens_popup_once_camera_arrives() {
    let mut ex = mounted();
    ex.select_country("ar");
    land(&mut ex);
    ex.advance(899);
    assert_eq!(map(&ex).open_popup_marker(), None);
    ex.advance(1);
    assert_eq!(popup_country(&ex).as_deref(), Some("ar"));
    assert!(matches!(ex.phase(), SelectionPhase::PopupOpen(_)));
    assert_eq!(ex.pending_tasks(), 0);
}

#[test]
fn safety_timeout_forces_popup_without_landing() {
    let mut ex = mounted();
    ex.select_country("ar");
    ex.advance(900);
    assert_eq!(map(&ex).open_popup_marker(), None);
    ex.advance(400);
    assert_eq!(popup_country(&ex).as_deref(), Some("ar"));
    assert_eq!(map(&ex).popups_opened(), 1);
}

#[test]
fn move_end_opens_popup_when_on_target() {
    let mut ex = mounted();
    ex.select_country("pe");
    ex.on_move_end();
    assert_eq!(map(&ex).open_popup_marker(), None);

    land(&mut ex);
    ex.on_move_end();
    assert_eq!(popup_country(&ex).as_deref(), Some("pe"));
    ex.advance(2_000);
    assert_eq!(map(&ex).popups_opened(), 1);
}

#[test]
fn superseded_selection_never_opens_its_popup() {
    let mut ex = mounted();
    ex.select_country("fr");
    ex.advance(500);
    ex.select_country("jp");
    ex.advance(5_000);
    assert_eq!(map(&ex).popups_opened(), 1);
    assert_eq!(popup_country(&ex).as_deref(), Some("jp"));
}

#[test]
fn map_click_deselects_and_removes_parameter() {
    let mut ex = mounted();
    ex.select_country("ca");
    ex.advance(1300);
    ex.drain_requests();
    ex.on_map_click();
    assert_eq!(ex.active_country_id(), None);
    assert_eq!(map(&ex).open_popup_marker(), None);
    assert_eq!(ex.drain_requests(), vec![HostRequest::WriteCountryParam(None)]);
    ex.on_map_click();
    assert!(ex.drain_requests().is_empty());
}

#[test]
fn marker_click_selects_that_exact_copy() {
    let mut ex = mounted();
    let idx = ex.registry().copies_of("nz")[2];
    let handle = ex.registry().entry(idx).unwrap().handle;
    ex.on_marker_click(handle);

    let sel = ex.active_selection().unwrap();
    assert_eq!(sel.entry, idx);
    assert!(sel.target.center.lng > 180.0);
    assert_eq!(
        ex.drain_requests(),
        vec![HostRequest::WriteCountryParam(Some("nz".to_string()))]
    );

    // The host echoes the parameter back; nothing happens.
    let flights = map(&ex).flights_started();
    ex.on_url_changed("country=nz");
    assert_eq!(map(&ex).flights_started(), flights);
}

#[test]
fn nearest_copy_follows_the_camera() {
    let mut ex = mounted();
    ex.map_mut()
        .unwrap()
        .jump_to(foundation::math::LatLng::new(-15.0, -175.0), 3.0);
    ex.select_country("fj");
    let entry = ex.active_selection().unwrap().entry;
    assert_eq!(ex.registry().entry(entry).unwrap().longitude_offset, -360.0);
}

#[test]
fn random_pick_respects_filters_across_seeds() {
    for seed in 0..40 {
        let mut ex = explorer_with(config(seed));
        ex.mount();
        ex.set_region_filter(RegionFilter::Region(Region::Europe));
        ex.set_territories_visible(false);
        ex.flush();

        let id = ex.pick_random().unwrap();
        let record = ex.catalog().get(&id).unwrap();
        assert_eq!(record.region, Region::Europe, "seed {seed} picked {id}");
        assert_ne!(record.kind, CountryKind::Territory, "seed {seed} picked {id}");
        assert_eq!(ex.active_country_id(), Some(id.as_str()));
    }
}

#[test]
fn random_pick_waits_for_previous_pick() {
    let mut ex = mounted();
    assert!(ex.pick_random().is_some());
    assert!(ex.pick_random().is_none());
    ex.advance(1300);
    assert!(matches!(ex.phase(), SelectionPhase::PopupOpen(_)));
    assert!(ex.pick_random().is_some());
}

#[test]
fn random_pick_with_nothing_visible_is_a_no_op() {
    let cat = Catalog::new(
        Catalog::builtin()
            .unwrap()
            .records()
            .iter()
            .filter(|r| r.kind == CountryKind::Territory)
            .cloned()
            .collect(),
    )
    .unwrap();
    let mut ex = Explorer::new(config(5), cat, |opts, size| Ok(HeadlessMap::new(opts, size)));
    ex.mount();
    ex.set_territories_visible(false);
    ex.flush();
    assert_eq!(ex.pick_random(), None);
    assert_eq!(map(&ex).flights_started(), 0);
}

#[test]
fn deep_links_alternating_countries_each_center_and_open() {
    let mut ex = mounted();
    let mut popups = 0;
    for (i, id) in ["fr", "jp", "fr"].into_iter().enumerate() {
        ex.on_url_changed(&format!("lang=en&country={id}"));
        assert_eq!(ex.active_country_id(), Some(id));
        assert_eq!(map(&ex).flights_started(), i + 1);
        ex.advance(1700);
        popups += 1;
        assert_eq!(popup_country(&ex).as_deref(), Some(id));
        assert_eq!(map(&ex).popups_opened(), popups);
    }
    // Deep links never write the parameter back.
    assert!(ex.drain_requests().is_empty());
}

#[test]
fn deep_link_settle_waits_extra_delay() {
    let mut ex = mounted();
    ex.on_url_changed("?country=eg");
    land(&mut ex);
    ex.advance(900);
    assert_eq!(map(&ex).open_popup_marker(), None);
    ex.advance(400);
    assert_eq!(popup_country(&ex).as_deref(), Some("eg"));
}

#[test]
fn deep_link_reveals_filtered_out_country() {
    let mut ex = mounted();
    ex.set_region_filter(RegionFilter::Region(Region::Americas));
    ex.set_de_facto_visible(false);
    ex.flush();
    ex.on_url_changed("country=tw");
    assert!(ex.view().de_facto_visible);
    assert_eq!(ex.view().region_filter, RegionFilter::All);
    ex.advance(1700);
    assert_eq!(popup_country(&ex).as_deref(), Some("tw"));
}

#[test]
fn repeated_or_unknown_links_are_ignored() {
    let mut ex = mounted();
    ex.on_url_changed("country=fr");
    ex.on_url_changed("country=fr&page=2");
    assert_eq!(map(&ex).flights_started(), 1);

    ex.on_url_changed("country=atlantis");
    assert_eq!(map(&ex).flights_started(), 1);
    assert_eq!(ex.active_country_id(), Some("fr"));

    ex.on_url_changed("");
    assert_eq!(ex.deep_link().last_processed(), None);
    ex.on_url_changed("country=fr");
    assert_eq!(map(&ex).flights_started(), 2);
}

#[test]
fn link_before_mount_applies_once_ready() {
    let mut ex = explorer_with(config(2));
    ex.on_url_changed("country=pt");
    ex.mount();
    assert_eq!(ex.active_country_id(), Some("pt"));
    ex.advance(1700);
    assert_eq!(popup_country(&ex).as_deref(), Some("pt"));
}

#[test]
fn failed_marker_record_is_skipped() {
    let mut ex = Explorer::new(config(4), Catalog::builtin().unwrap(), |opts, size| {
        let mut map = HeadlessMap::new(opts, size);
        map.fail_markers_for("fr");
        Ok(map)
    });
    ex.mount();
    let summary = ex.last_init().unwrap();
    assert_eq!(summary.failures.len(), 3);
    assert_eq!(ex.registry().country_count(), ex.catalog().len() - 1);
    assert!(!ex.select_country("fr"));
    assert!(ex.select_country("de"));
}

#[test]
fn unmount_stops_everything() {
    let mut ex = mounted();
    ex.select_country("in");
    ex.set_region_filter(RegionFilter::Region(Region::Asia));
    ex.unmount();

    assert_eq!(ex.lifecycle(), Lifecycle::Disposed);
    assert!(ex.map().is_none());
    assert_eq!(ex.pending_tasks(), 0);
    ex.advance(10_000);
    assert_eq!(ex.active_country_id(), None);
    assert!(!ex.select_country("in"));
    assert_eq!(ex.pick_random(), None);
    ex.on_url_changed("country=fr");
    ex.on_map_click();
    ex.on_move_end();
    assert_eq!(ex.active_country_id(), None);
}
