//! Default fixup handler logging
//!
//! The default handler emits one structured warning per fixup. These tests
//! capture events with a tracing-subscriber layer.

use serde_json::json;
use settings_tree::{FieldSpec, Fixup, Settings, SettingsOptions, FIXUP_TAG, FIXUP_TARGET};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

type Captured = Arc<Mutex<Vec<BTreeMap<String, String>>>>;

#[derive(Default)]
struct FieldVisitor(BTreeMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

struct CaptureLayer(Captured);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != FIXUP_TARGET {
            return;
        }
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        visitor
            .0
            .insert("level".to_string(), event.metadata().level().to_string());
        self.0.lock().unwrap().push(visitor.0);
    }
}

fn with_captured_events(f: impl FnOnce()) -> Vec<BTreeMap<String, String>> {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(captured.clone()));
    tracing::subscriber::with_default(subscriber, f);
    let events = captured.lock().unwrap().clone();
    events
}

fn port_spec() -> FieldSpec {
    FieldSpec::new().initial_value(8080).fixup(|v| match v.as_u64() {
        Some(port) if port > 65535 => Ok(Some(Fixup::new(65535, ["clamped to 65535"]))),
        _ => Ok(None),
    })
}

#[test]
fn test_default_handler_emits_one_warning() {
    let events = with_captured_events(|| {
        let mut settings =
            Settings::create(SettingsOptions::default().field("port", port_spec())).unwrap();
        settings.change(json!({"port": 70000})).unwrap();
        assert_eq!(settings.get_u64("port"), Some(65535));
    });

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event["level"], "WARN");
    assert_eq!(event["tag"], FIXUP_TAG);
    assert_eq!(event["name"], "port");
    assert_eq!(event["before"], "70000");
    assert_eq!(event["after"], "65535");
    assert!(event["messages"].contains("clamped to 65535"));
    assert!(event["message"].contains("\"port\""));
}

#[test]
fn test_no_warning_without_fixup() {
    let events = with_captured_events(|| {
        let mut settings =
            Settings::create(SettingsOptions::default().field("port", port_spec())).unwrap();
        settings.change(json!({"port": 443})).unwrap();
    });

    assert!(events.is_empty());
}

#[test]
fn test_custom_handler_suppresses_default_unless_chained() {
    let silent = with_captured_events(|| {
        let mut settings = Settings::create(
            SettingsOptions::default()
                .field("port", port_spec())
                .on_fixup(|_, _| Ok(())),
        )
        .unwrap();
        settings.change(json!({"port": 99999})).unwrap();
    });
    assert!(silent.is_empty());

    let chained = with_captured_events(|| {
        let mut settings = Settings::create(
            SettingsOptions::default()
                .field("port", port_spec())
                .on_fixup(|info, default| {
                    default(info);
                    Ok(())
                }),
        )
        .unwrap();
        settings.change(json!({"port": 99999})).unwrap();
    });
    assert_eq!(chained.len(), 1);
    assert_eq!(chained[0]["before"], "99999");
}
