use bulk_nominatim::core::lookup::lookup_point;
use bulk_nominatim::domain::model::Coordinate;
use bulk_nominatim::domain::ports::ConfigProvider;
use bulk_nominatim::utils::validation::Validate;
use bulk_nominatim::{NominatimClient, Settings};
use httpmock::prelude::*;
use tempfile::TempDir;

#[test]
fn test_saved_settings_are_used_next_run() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bulk-nominatim.toml");

    let first = Settings::load_or_default(&path).unwrap();
    assert_eq!(first, Settings::default());

    let mut changed = first.clone();
    changed.service.url = "http://nominatim.internal:8080".to_string();
    changed.batch.max_address = 2500;
    changed.batch.level_of_detail = 10;
    changed.save(&path).unwrap();

    let second = Settings::load_or_default(&path).unwrap();
    assert_eq!(second.search_url(), "http://nominatim.internal:8080/search");
    assert_eq!(second.max_address(), 2500);
    assert_eq!(second.level_of_detail(), 10);
}

#[test]
fn test_invalid_settings_are_not_saved() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bulk-nominatim.toml");

    let mut settings = Settings::default();
    settings.batch.max_address = 0;

    assert!(settings.validate().is_err());
    assert!(settings.save(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_point_lookup_against_service() {
    let server = MockServer::start();
    let reverse = server.mock(|when, then| {
        when.method(GET)
            .path("/reverse")
            .query_param("lat", "51.500700")
            .query_param("lon", "-0.124600")
            .query_param("polygon_text", "1");
        then.status(200).json_body(serde_json::json!({
            "display_name": "Big Ben, London",
            "lat": "51.5007",
            "lon": "-0.1246",
            "geotext": "POLYGON((-0.1247 51.5006,-0.1245 51.5006,-0.1245 51.5008,-0.1247 51.5006))"
        }));
    });

    let mut settings = Settings::default();
    settings.service.url = server.base_url();
    let client = NominatimClient::new(&settings.service.user_agent, None).unwrap();

    let found = tokio_test::block_on(lookup_point(
        &client,
        &settings,
        Coordinate::new(-0.1246, 51.5007),
    ))
    .unwrap();

    reverse.assert();
    assert_eq!(found.text, "Big Ben, London");
    assert!(found.outline.unwrap().starts_with("POLYGON"));
    assert!(found.marker.is_none());
}
