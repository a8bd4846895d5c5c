use super::http::{Request, Response};
use crate::error::{Result, SentinelError};
use crate::sentinel::{AlertQuery, ConfigUpdate, Sentinel};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;

const INDEX_HTML: &str = include_str!("index.html");

/// Dispatches one request against the dashboard state.
pub fn handle(sentinel: &Arc<Sentinel>, req: &Request) -> Response {
    let segments: Vec<&str> = req.path.trim_matches('/').split('/').collect();

    let result = match (req.method.as_str(), segments.as_slice()) {
        ("GET", [""]) => return Response::html(INDEX_HTML),
        ("GET", ["api", "config"]) => Ok(sentinel.public_config()),
        ("POST", ["api", "config"]) => post_config(sentinel, req),
        ("GET", ["api", "status"]) => Ok(status(sentinel)),
        ("GET", ["api", "devices"]) => Ok(devices(sentinel, req)),
        ("GET", ["api", "ssids"]) => Ok(match sentinel.ssids() {
            Ok(ssids) => json!({ "ok": true, "ssids": ssids }),
            Err(e) => json!({ "ok": false, "error": e.to_string() }),
        }),
        ("GET", ["api", "stats"]) => Ok(json!(sentinel.stats())),
        ("GET", ["api", "alerts"]) => alerts(sentinel, req),
        ("POST", ["api", "alerts", "clear"]) => {
            sentinel.clear_alerts();
            Ok(json!({ "ok": true }))
        }
        ("POST", ["api", "alerts", "poll"]) => {
            let sentinel = Arc::clone(sentinel);
            std::thread::spawn(move || {
                sentinel.poll_kismet_alerts();
            });
            Ok(json!({ "ok": true }))
        }
        ("POST", ["api", "save"]) => post_save(sentinel, req),
        ("GET", ["api", "save", "log"]) => Ok(json!({ "log": sentinel.save_log() })),
        ("GET", ["api", "schedules"]) => Ok(json!({ "schedules": sentinel.schedules() })),
        ("POST", ["api", "schedules"]) => post_schedule(sentinel, req),
        ("POST", ["api", "schedules", id]) => toggle_schedule(sentinel, req, id),
        ("DELETE", ["api", "schedules", id]) => {
            let removed = sentinel.remove_schedule(id);
            Ok(json!({ "ok": true, "removed": removed }))
        }
        ("GET", ["api", "automations"]) => Ok(json!({
            "automations": sentinel.automations(),
            "watched_devices": sentinel.watched_devices(),
        })),
        ("POST", ["api", "automations"]) => req.json().map_err(SentinelError::from).map(|update| {
            json!({ "ok": true, "automations": sentinel.update_automations(&update) })
        }),
        ("GET", ["api", "automations", "saves"]) => Ok(json!({ "saves": sentinel.alert_saves() })),
        ("GET", ["api", "watchlist"]) => Ok(json!({ "devices": sentinel.watched_devices() })),
        ("POST", ["api", "watchlist"]) => post_watch(sentinel, req),
        ("DELETE", ["api", "watchlist", mac]) => sentinel
            .unwatch(mac)
            .map(|size| json!({ "ok": true, "watched": size })),
        _ => Err(SentinelError::NotFound(format!("{} {}", req.method, req.path))),
    };

    match result {
        Ok(body) => Response::ok(&body),
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                log::error!("{} {} failed: {}", req.method, req.path, e);
            } else {
                log::debug!("{} {} rejected: {}", req.method, req.path, e);
            }
            Response::json(status, &json!({ "ok": false, "error": e.to_string() }))
        }
    }
}

fn post_config(sentinel: &Sentinel, req: &Request) -> Result<Value> {
    let update: ConfigUpdate = serde_json::from_value(req.json()?)?;
    sentinel.update_config(update);
    Ok(json!({ "ok": true }))
}

fn status(sentinel: &Sentinel) -> Value {
    match sentinel.status() {
        Ok(data) => json!({ "ok": true, "data": data }),
        Err(e) => {
            log::debug!("Status unavailable: {}", e);
            json!({ "ok": false, "error": "Kismet not available" })
        }
    }
}

fn devices(sentinel: &Sentinel, req: &Request) -> Value {
    let since = req
        .query_param("since")
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|ts| *ts != 0);

    match sentinel.browse_devices(since) {
        Ok(devices) => json!({ "ok": true, "devices": devices, "ts": Utc::now().timestamp() }),
        Err(e) => {
            log::debug!("Devices unavailable: {}", e);
            json!({ "ok": false, "error": "Kismet not available" })
        }
    }
}

fn alerts(sentinel: &Sentinel, req: &Request) -> Result<Value> {
    let limit = match req.query_param("limit") {
        Some(raw) => Some(
            raw.parse::<usize>()
                .map_err(|_| SentinelError::bad_request(format!("invalid limit '{}'", raw)))?,
        ),
        None => None,
    };

    // An unknown filter value matches nothing.
    let severity = req.query_param("severity").map(str::parse);
    let category = req.query_param("type").map(str::parse);
    if matches!(severity, Some(Err(_))) || matches!(category, Some(Err(_))) {
        return Ok(json!({ "alerts": [] }));
    }

    let query = AlertQuery {
        severity: severity.and_then(|r| r.ok()),
        category: category.and_then(|r| r.ok()),
        limit,
    };
    Ok(json!({ "alerts": sentinel.alerts(&query) }))
}

fn post_save(sentinel: &Sentinel, req: &Request) -> Result<Value> {
    let body = req.json()?;
    let label = body
        .get("label")
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty())
        .unwrap_or("manual");
    sentinel.queue_batch_save(label);
    Ok(json!({ "ok": true, "message": "Save started" }))
}

fn post_schedule(sentinel: &Sentinel, req: &Request) -> Result<Value> {
    let body = req.json()?;
    let name = body.get("name").and_then(Value::as_str).unwrap_or("Auto Save");
    let interval_min = match body.get("interval_min") {
        None | Some(Value::Null) => 30,
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| SentinelError::bad_request("interval_min must be a positive integer"))?,
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| SentinelError::bad_request(format!("invalid interval_min '{}'", s)))?,
        Some(_) => return Err(SentinelError::bad_request("interval_min must be a positive integer")),
    };

    let schedule = sentinel.add_schedule(name, interval_min)?;
    Ok(json!({ "ok": true, "schedule": schedule }))
}

fn toggle_schedule(sentinel: &Sentinel, req: &Request, id: &str) -> Result<Value> {
    let body = req.json()?;
    let enabled = body
        .get("enabled")
        .and_then(Value::as_bool)
        .ok_or_else(|| SentinelError::bad_request("enabled (bool) required"))?;
    let schedule = sentinel.set_schedule_enabled(id, enabled)?;
    Ok(json!({ "ok": true, "schedule": schedule }))
}

fn post_watch(sentinel: &Sentinel, req: &Request) -> Result<Value> {
    let body = req.json()?;
    let field = |key: &str| body.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    let size = sentinel.watch(&field("mac"), &field("name"), &field("phyname"))?;
    Ok(json!({ "ok": true, "watched": size }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::testing::{FakeSource, device, sentinel_with};

    fn request(method: &str, target: &str, body: Value) -> Request {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Request {
            method: method.to_string(),
            path: path.to_string(),
            query: crate::api::http::parse_query_params(query),
            body: if body.is_null() { Vec::new() } else { serde_json::to_vec(&body).unwrap() },
            ..Request::default()
        }
    }

    fn call(sentinel: &Arc<Sentinel>, method: &str, target: &str, body: Value) -> (u16, Value) {
        let response = handle(sentinel, &request(method, target, body));
        let value = if response.content_type.starts_with("application/json") {
            serde_json::from_slice(&response.body).unwrap()
        } else {
            Value::Null
        };
        (response.status, value)
    }

    fn sentinel(source: FakeSource) -> (tempfile::TempDir, Arc<Sentinel>) {
        let (dir, sentinel, _rx) = sentinel_with(source, |_| {});
        (dir, Arc::new(sentinel))
    }

    #[test]
    fn index_serves_html() {
        let (_dir, s) = sentinel(FakeSource::offline());
        let response = handle(&s, &request("GET", "/", Value::Null));
        assert_eq!(response.status, 200);
        assert!(response.content_type.starts_with("text/html"));
    }

    #[test]
    fn index_reaches_settings_automations_and_alert_saves() {
        for path in ["/api/config", "/api/automations", "/api/automations/saves"] {
            assert!(INDEX_HTML.contains(path), "{path}");
        }
        assert!(!INDEX_HTML.contains("onclick="));
    }

    #[test]
    fn unknown_route_is_404() {
        let (_dir, s) = sentinel(FakeSource::offline());
        assert_eq!(call(&s, "GET", "/api/nope", Value::Null).0, 404);
        assert_eq!(call(&s, "PUT", "/api/alerts", Value::Null).0, 404);
    }

    #[test]
    fn malformed_json_is_400() {
        let (_dir, s) = sentinel(FakeSource::offline());
        let mut req = request("POST", "/api/watchlist", Value::Null);
        req.body = b"{not json".to_vec();
        assert_eq!(handle(&s, &req).status, 400);
    }

    #[test]
    fn devices_endpoint_classifies() {
        let drone = device("60:60:1F:AA:BB:CC", "DJI-Mavic-3-Pro", "DJI Technology", "IEEE802.11", -38);
        let (_dir, s) = sentinel(FakeSource::with_devices(vec![drone]));
        let (status, body) = call(&s, "GET", "/api/devices?since=0", Value::Null);
        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
        assert_eq!(body["devices"].as_array().unwrap().len(), 1);

        let (_, body) = call(&s, "GET", "/api/alerts?type=drone&severity=critical", Value::Null);
        assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
        let (_, body) = call(&s, "GET", "/api/alerts?limit=1", Value::Null);
        assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
        let (_, body) = call(&s, "GET", "/api/alerts?type=bogus", Value::Null);
        assert!(body["alerts"].as_array().unwrap().is_empty());
        assert_eq!(call(&s, "GET", "/api/alerts?limit=abc", Value::Null).0, 400);

        let (_, stats) = call(&s, "GET", "/api/stats", Value::Null);
        assert_eq!(stats["total_alerts"], 2);

        call(&s, "POST", "/api/alerts/clear", Value::Null);
        let (_, body) = call(&s, "GET", "/api/alerts", Value::Null);
        assert!(body["alerts"].as_array().unwrap().is_empty());
    }

    #[test]
    fn offline_without_demo_reports_unavailable() {
        let (_dir, s) = sentinel(FakeSource::offline());
        let (status, body) = call(&s, "GET", "/api/status", Value::Null);
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "ok": false, "error": "Kismet not available" }));
        let (_, body) = call(&s, "GET", "/api/devices", Value::Null);
        assert_eq!(body["ok"], false);
    }

    #[test]
    fn demo_devices_are_served_without_automations() {
        let (dir, sentinel, rx) = sentinel_with(FakeSource::offline(), |c| c.demo_mode = true);
        let s = Arc::new(sentinel);
        let (_, body) = call(&s, "GET", "/api/devices", Value::Null);
        assert_eq!(body["ok"], true);
        assert!(!body["devices"].as_array().unwrap().is_empty());

        assert_eq!(rx.try_iter().count(), 0);
        let (_, body) = call(&s, "GET", "/api/watchlist", Value::Null);
        assert!(body["devices"].as_array().unwrap().is_empty());
        assert!(!dir.path().join("saves").join("watchlist.json").exists());
    }

    #[test]
    fn watchlist_endpoints() {
        let (_dir, s) = sentinel(FakeSource::offline());
        let (status, body) = call(&s, "POST", "/api/watchlist", json!({ "name": "x" }));
        assert_eq!(status, 400);
        assert_eq!(body["ok"], false);

        let (status, body) =
            call(&s, "POST", "/api/watchlist", json!({ "mac": "aa:bb:cc:11:22:33", "name": "Home" }));
        assert_eq!(status, 200);
        assert_eq!(body["watched"], 1);

        let (_, body) = call(&s, "GET", "/api/watchlist", Value::Null);
        assert_eq!(body["devices"][0]["mac"], "AA:BB:CC:11:22:33");

        let (_, body) = call(&s, "DELETE", "/api/watchlist/aa:bb:cc:11:22:33", Value::Null);
        assert_eq!(body["watched"], 0);
    }

    #[test]
    fn schedule_endpoints() {
        let (_dir, s) = sentinel(FakeSource::offline());
        let (_, body) = call(&s, "POST", "/api/schedules", json!({}));
        assert_eq!(body["schedule"]["name"], "Auto Save");
        assert_eq!(body["schedule"]["interval_min"], 30);
        let id = body["schedule"]["id"].as_str().unwrap().to_string();

        let (_, body) = call(&s, "POST", "/api/schedules", json!({ "name": "Fast", "interval_min": "5" }));
        assert_eq!(body["schedule"]["interval_min"], 5);
        assert_eq!(call(&s, "POST", "/api/schedules", json!({ "interval_min": 0 })).0, 400);
        assert_eq!(call(&s, "POST", "/api/schedules", json!({ "interval_min": u64::MAX })).0, 400);
        assert_eq!(
            call(&s, "POST", "/api/schedules", json!({ "interval_min": 1_000_000_000_000u64 })).0,
            400
        );

        let (_, body) = call(&s, "POST", &format!("/api/schedules/{id}"), json!({ "enabled": false }));
        assert_eq!(body["schedule"]["enabled"], false);
        assert_eq!(call(&s, "POST", "/api/schedules/missing", json!({ "enabled": true })).0, 404);

        let (_, body) = call(&s, "DELETE", &format!("/api/schedules/{id}"), Value::Null);
        assert_eq!(body["removed"], true);
        let (_, body) = call(&s, "GET", "/api/schedules", Value::Null);
        assert_eq!(body["schedules"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn config_and_automations_endpoints() {
        let (_dir, s) = sentinel(FakeSource::offline());
        let (_, body) = call(&s, "POST", "/api/config", json!({ "api_key": "k", "password": "p" }));
        assert_eq!(body["ok"], true);
        let (_, body) = call(&s, "GET", "/api/config", Value::Null);
        assert_eq!(body["api_key"], "***");
        assert!(body.get("password").is_none());

        let (_, body) = call(&s, "POST", "/api/automations", json!({ "save_watched_only": true }));
        assert_eq!(body["automations"]["save_watched_only"], true);
        let (_, body) = call(&s, "GET", "/api/automations", Value::Null);
        assert!(body["watched_devices"].as_array().unwrap().is_empty());
        let (_, body) = call(&s, "GET", "/api/automations/saves", Value::Null);
        assert!(body["saves"].as_array().unwrap().is_empty());
    }

    #[test]
    fn save_is_queued() {
        let (_dir, sentinel, rx) = sentinel_with(FakeSource::offline(), |_| {});
        let s = Arc::new(sentinel);
        let (_, body) = call(&s, "POST", "/api/save", json!({ "label": "sweep" }));
        assert_eq!(body["message"], "Save started");
        assert!(matches!(
            rx.try_recv(),
            Ok(crate::storage::SaveJob::Batch { label }) if label == "sweep"
        ));
    }
}
