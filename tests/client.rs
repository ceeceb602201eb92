use mockito::{Matcher, Server};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use powerwall::{
    DeviceType, Error, GridStatus, IslandMode, MeterType, OperationMode, Powerwall, Precision,
    Role, ValidationMode,
};

fn meter_json(power: f64) -> Value {
    json!({
        "instant_power": power,
        "last_communication_time": "2023-03-06T12:00:00+01:00",
        "frequency": 50.0,
        "energy_exported": 10_429_451.0,
        "energy_imported": 4_824_170.0,
        "instant_average_voltage": 232.1,
        "instant_total_current": 14.2,
    })
}

static METERS_AGGREGATES: Lazy<Value> = Lazy::new(|| {
    json!({
        "site": meter_json(-100.0),
        "battery": meter_json(0.0),
        "load": meter_json(900.0),
        "solar": meter_json(1_500.0),
    })
});

static STATUS: Lazy<Value> = Lazy::new(|| {
    json!({
        "start_time": "2020-10-28 20:14:11 +0800",
        "up_time_seconds": "17h11m31.214751424s",
        "is_new": false,
        "version": "1.50.1 c58c2df3",
        "git_hash": "c58c2df39ec207708c4cde0c747db7cf31265519",
        "commission_count": 0,
        "device_type": "hec",
        "sync_type": "v1",
    })
});

static SYSTEM_STATUS: Lazy<Value> = Lazy::new(|| {
    json!({
        "nominal_full_pack_energy": 28078,
        "nominal_energy_remaining": 14807,
        "battery_blocks": [
            {
                "PackagePartNumber": "XXX-G",
                "PackageSerialNumber": "TGXXX",
                "energy_charged": 5_525_740,
                "energy_discharged": 4_659_550,
                "nominal_energy_remaining": 7378,
                "nominal_full_pack_energy": 14031,
                "wobble_detected": false,
                "pinv_grid_state": "Grid_Compliant",
            },
            {
                "PackagePartNumber": "XXX-E",
                "PackageSerialNumber": "TGYYY",
                "energy_charged": null,
                "energy_discharged": null,
                "nominal_energy_remaining": null,
                "nominal_full_pack_energy": null,
                "wobble_detected": false,
                "pinv_grid_state": "Grid_Disabled",
                "disabled_reasons": ["DisabledExcessiveVoltageDrop"],
            },
        ],
    })
});

fn client(server: &Server) -> Powerwall {
    Powerwall::new(&server.url()).unwrap()
}

#[test]
fn gets_charge_with_exact_and_rounded_value() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/system_status/soe")
        .with_body(r#"{"percentage": 53.123423}"#)
        .create();

    let charge = client(&server).charge().unwrap();
    assert_eq!(charge.percentage, 53.123423);
    assert_eq!(charge.rounded(Precision::Round(0)), 53.0);
    mock.assert();
}

#[test]
fn gets_status_and_version() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/status")
        .with_body(STATUS.to_string())
        .create();

    let gateway = client(&server);
    let status = gateway.status().unwrap();
    assert_eq!(status.device_type, DeviceType::Gw1);
    assert_eq!(status.short_version(), "1.50.1");
    assert_eq!(status.up_time.as_secs(), 61_891);
    assert_eq!(status.start_time.to_rfc3339(), "2020-10-28T20:14:11+08:00");
}

#[test]
fn gets_meters_and_flow_directions() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/meters/aggregates")
        .with_body(METERS_AGGREGATES.to_string())
        .create();

    let meters = client(&server).meters().unwrap();
    assert_eq!(
        meters.available_meters(),
        vec![
            MeterType::Solar,
            MeterType::Site,
            MeterType::Battery,
            MeterType::Load
        ]
    );

    let solar = meters.meter(MeterType::Solar).unwrap();
    assert!(solar.is_active());
    assert!(solar.is_drawing_from());
    assert!(!solar.is_sending_to());

    let site = meters.meter(MeterType::Site).unwrap();
    assert!(site.is_sending_to());

    let load = meters.meter(MeterType::Load).unwrap();
    assert!(!load.is_drawing_from());
    assert!(load.is_sending_to());

    assert!(meters.get_meter(MeterType::Generator).is_none());
    match meters.meter(MeterType::Generator).unwrap_err() {
        Error::MeterNotAvailable { meter, available } => {
            assert_eq!(meter, MeterType::Generator);
            assert!(!available.contains(&MeterType::Generator));
            assert!(available.contains(&MeterType::Solar));
        }
        other => panic!("expected MeterNotAvailable, got {other:?}"),
    }
}

#[test]
fn meter_site_unwraps_the_single_entry_array() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/meters/site")
        .with_body(
            json!([{
                "location": "site",
                "Cached_readings": {
                    "instant_power": -18.00000076368451,
                    "last_communication_time": "2023-03-06T12:00:00+01:00",
                    "frequency": 49.99,
                    "energy_exported": 10_429_451.0,
                    "energy_imported": 4_824_170.0,
                    "instant_average_voltage": 232.1,
                    "instant_total_current": 14.2,
                    "v_l1n": 230.1,
                    "v_l2n": 231.9,
                }
            }])
            .to_string(),
        )
        .create();

    let details = client(&server).meter_site().unwrap();
    assert_eq!(details.location, MeterType::Site);
    assert_eq!(details.readings.reading.instant_power, -18.00000076368451);
    assert!(details.readings.v_l3n.is_absent());
}

#[test]
fn empty_meter_details_is_an_api_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/meters/solar")
        .with_body("[]")
        .create();

    match client(&server).meter_solar().unwrap_err() {
        Error::Api(msg) => assert!(msg.contains("solar meter")),
        other => panic!("expected Api, got {other:?}"),
    }
}

#[test]
fn gets_system_status_and_batteries() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/system_status")
        .with_body(SYSTEM_STATUS.to_string())
        .expect(3)
        .create();

    let gateway = client(&server);
    assert_eq!(gateway.capacity().unwrap(), 28078.0);
    assert_eq!(gateway.energy().unwrap(), 14807.0);

    let batteries = gateway.batteries().unwrap();
    assert_eq!(batteries.len(), 2);
    assert_eq!(batteries[0].part_number, "XXX-G");
    assert_eq!(batteries[0].energy_remaining, Some(7378));
    assert_eq!(batteries[1].energy_charged, None);
    assert_eq!(
        batteries[1].disabled_reasons,
        vec!["DisabledExcessiveVoltageDrop"]
    );
}

#[test]
fn gets_operation_settings() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/operation")
        .with_body(
            r#"{"real_mode": "self_consumption", "backup_reserve_percent": 5.000019999999999}"#,
        )
        .expect(2)
        .create();

    let gateway = client(&server);
    assert_eq!(
        gateway.operation_mode().unwrap(),
        OperationMode::SelfConsumption
    );
    assert_eq!(
        gateway.backup_reserve_percentage().unwrap(),
        5.000019999999999
    );
}

#[test]
fn gets_grid_status() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/system_status/grid_status")
        .with_body(r#"{"grid_status": "SystemGridConnected", "grid_services_active": false}"#)
        .expect(2)
        .create();

    let gateway = client(&server);
    assert_eq!(gateway.grid_status().unwrap(), GridStatus::Connected);
    assert!(!gateway.is_grid_services_active().unwrap());
}

#[test]
fn gets_serial_numbers_and_gateway_din() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/powerwalls")
        .with_body(
            json!({
                "powerwalls": [
                    {"PackageSerialNumber": "SerialNumber1"},
                    {"PackageSerialNumber": "SerialNumber2"},
                ],
                "gateway_din": "gateway_din",
            })
            .to_string(),
        )
        .expect(2)
        .create();

    let gateway = client(&server);
    assert_eq!(
        gateway.serial_numbers().unwrap(),
        vec!["SerialNumber1", "SerialNumber2"]
    );
    assert_eq!(gateway.gateway_din().unwrap(), "gateway_din");
}

#[test]
fn login_posts_credentials_and_tracks_the_session() {
    let mut server = Server::new();
    let login_mock = server
        .mock("POST", "/api/login/Basic")
        .match_body(Matcher::Json(json!({
            "username": "customer",
            "email": "owner@example.com",
            "password": "hunter2",
            "force_sm_off": false,
        })))
        .with_body(
            json!({
                "firstname": "Tesla",
                "lastname": "Energy",
                "token": "22y7Ghvk3bFMNP1EBvRoGXGKbn5H2dLnogIFhMJPq31RMJQBlXWgtg==",
                "roles": ["Home_Owner"],
                "loginTime": "2023-03-06T12:00:23.433+01:00",
            })
            .to_string(),
        )
        .create();
    let logout_mock = server.mock("GET", "/api/logout").with_body("").create();

    let mut gateway = client(&server);
    assert!(!gateway.is_authenticated());

    let login = gateway.login("hunter2", "owner@example.com").unwrap();
    assert_eq!(login.roles, vec![Role::HomeOwner]);
    assert!(gateway.is_authenticated());

    gateway.logout().unwrap();
    assert!(!gateway.is_authenticated());

    login_mock.assert();
    logout_mock.assert();
}

#[test]
fn logout_without_login_is_an_error() {
    let server = Server::new();
    let mut gateway = client(&server);
    assert!(matches!(gateway.logout(), Err(Error::Api(_))));
}

#[test]
fn sets_island_mode() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/v2/islanding/mode")
        .match_body(Matcher::Json(
            json!({"island_mode": "intentional_reconnect_failsafe"}),
        ))
        .with_body(r#"{"island_mode": "intentional_reconnect_failsafe"}"#)
        .create();

    let mode = client(&server).set_island_mode(IslandMode::Offgrid).unwrap();
    assert_eq!(mode, IslandMode::Offgrid);
    mock.assert();
}

#[test]
fn sitemaster_run_and_stop_accept_empty_bodies() {
    let mut server = Server::new();
    let run_mock = server.mock("GET", "/api/sitemaster/run").with_body("").create();
    let stop_mock = server.mock("GET", "/api/sitemaster/stop").with_body("").create();

    let gateway = client(&server);
    gateway.run().unwrap();
    gateway.stop().unwrap();
    run_mock.assert();
    stop_mock.assert();
}

#[test]
fn strict_client_reports_drift_with_the_full_missing_set() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/status")
        .with_body(r#"{"device_type": "teg", "up_time_seconds": "5m", "uuid": "abc"}"#)
        .create();

    match client(&server).status().unwrap_err() {
        Error::SchemaDrift {
            shape,
            missing,
            added,
            raw,
        } => {
            assert_eq!(shape, "status");
            assert_eq!(missing, vec!["start_time", "version", "git_hash"]);
            assert_eq!(added, vec!["uuid".to_string()]);
            assert_eq!(raw["device_type"], json!("teg"));
        }
        other => panic!("expected SchemaDrift, got {other:?}"),
    }
}

#[test]
fn lenient_client_tolerates_dropped_meter_fields() {
    let mut server = Server::new();
    let mut load = meter_json(900.0);
    load.as_object_mut().unwrap().remove("frequency");
    let _mock = server
        .mock("GET", "/api/meters/aggregates")
        .with_body(json!({"load": load, "site": meter_json(-100.0)}).to_string())
        .expect(2)
        .create();

    // Strict fails on the malformed load meter...
    assert!(client(&server).meters().is_err());

    // ...lenient keeps the healthy part of the aggregate.
    let gateway = client(&server).with_mode(ValidationMode::Lenient);
    let meters = gateway.meters().unwrap();
    assert_eq!(meters.available_meters(), vec![MeterType::Site]);
}

#[test]
fn access_denied_carries_device_details() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/sitemaster")
        .with_status(401)
        .with_body(r#"{"error": "AuthRequired", "message": "please log in"}"#)
        .create();

    match client(&server).sitemaster().unwrap_err() {
        Error::AccessDenied {
            resource,
            error,
            message,
        } => {
            assert_eq!(resource, "sitemaster");
            assert_eq!(error.as_deref(), Some("AuthRequired"));
            assert_eq!(message.as_deref(), Some("please log in"));
        }
        other => panic!("expected AccessDenied, got {other:?}"),
    }
}

#[test]
fn gets_site_info() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/site_info")
        .with_body(
            json!({
                "nominal_system_energy_kWh": 27.0,
                "nominal_system_power_kW": 10.8,
                "site_name": "test",
                "timezone": "Europe/Berlin",
                "grid_code": "50Hz_230V_1_VDE4105:2018_Germany",
                "grid_voltage_setting": 230.0,
                "grid_freq_setting": 50.0,
                "grid_phase_setting": "Single",
                "country": "Germany",
                "state": "*",
            })
            .to_string(),
        )
        .create();

    let info = client(&server).site_info().unwrap();
    assert_eq!(info.nominal_system_energy_kwh, 27.0);
    assert_eq!(info.timezone, "Europe/Berlin");
    assert!(info.utility.is_absent());
}

#[test]
fn gets_vin_from_config() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/config")
        .with_body(r#"{"vin": "1232100-00-E--TG123456789012", "completed_on": null}"#)
        .create();

    assert_eq!(
        client(&server).vin().unwrap(),
        "1232100-00-E--TG123456789012"
    );
}

#[test]
fn missing_vin_is_schema_drift() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/config")
        .with_body(r#"{"completed_on": null}"#)
        .create();

    match client(&server).vin().unwrap_err() {
        Error::SchemaDrift { shape, missing, .. } => {
            assert_eq!(shape, "config");
            assert_eq!(missing, vec!["vin"]);
        }
        other => panic!("expected SchemaDrift, got {other:?}"),
    }
}

#[test]
fn gets_solars() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/solars")
        .with_body(
            json!([{"brand": "SunPower", "model": "E20-327", "power_rating_watts": 5000}])
                .to_string(),
        )
        .create();

    let solars = client(&server).solars().unwrap();
    assert_eq!(solars.len(), 1);
    assert_eq!(solars[0].brand, "SunPower");
    assert_eq!(solars[0].power_rating_watts, 5000);
}
