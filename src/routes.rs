use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::models::{Answers, Entry, PreviewData, Settings, ToastData};
use crate::notify::{Permission, TOAST_ENTRY_SAVED, TOAST_PERMISSION_GRANTED, TOAST_PERMISSION_REFUSED};
use crate::stats::compute_stats;
use crate::store;
use crate::timing::ReminderPoller;
use crate::types::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionData {
    permission: Permission,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(get_settings)
        .service(update_settings)
        .service(get_permission)
        .service(request_permission)
        .service(schedule_preview)
        .service(list_entries)
        .service(create_entry)
        .service(get_stats)
        .service(get_toast)
        .service(dismiss_toast);
}

/// Persist the settings and start the day's plan over under them.
/// The poller is stopped before the reset so an old loop cannot regenerate
/// the schedule with stale settings in between.
async fn apply_settings(state: &AppState, poller: &mut ReminderPoller, settings: Settings) {
    poller.stop().await;
    store::save_settings(state.store.as_ref(), &settings);
    state.manager.lock().await.reset_schedule();
    poller.arm(settings).await;
    debug!("settings:: applied {:?}, polling={}", settings, poller.is_running());
}

#[get("/health")]
pub async fn health() -> impl Responder {
    info!("Health check");
    HttpResponse::Ok()
}

#[get("/settings")]
async fn get_settings(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(store::load_settings(state.store.as_ref()))
}

/// Fields missing from the body keep their stored values.
#[put("/settings")]
async fn update_settings(payload: web::Json<serde_json::Value>,
    state: web::Data<AppState>) -> impl Responder {

    let patch = payload.into_inner();
    if !patch.is_object() {
        return HttpResponse::BadRequest().json(json!({
            "error": "settings must be a JSON object",
        }));
    }

    // held across load and save so concurrent updates apply one after the other
    let mut poller = state.poller.lock().await;
    let stored = store::load_settings(state.store.as_ref());
    let settings = match stored.patched(&patch) {
        Ok(settings) => settings.clamped(),
        Err(e) => {
            warn!("settings:: rejected update: {e}");
            return HttpResponse::BadRequest().json(json!({
                "error": e.to_string(),
            }));
        }
    };
    if !settings.has_valid_window() {
        warn!("settings:: rejected window {}h-{}h", settings.start_hour, settings.end_hour);
        return HttpResponse::BadRequest().json(json!({
            "error": "endHour must be after startHour",
        }));
    }

    apply_settings(&state, &mut poller, settings).await;
    HttpResponse::Ok().json(settings)
}

#[get("/permission")]
async fn get_permission(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(PermissionData { permission: state.notifier.permission() })
}

#[post("/permission")]
async fn request_permission(state: web::Data<AppState>) -> impl Responder {
    let permission = state.notifier.request_permission().await;

    let mut poller = state.poller.lock().await;
    let settings = store::load_settings(state.store.as_ref());
    if permission == Permission::Granted {
        apply_settings(&state, &mut poller, Settings { notifications_enabled: true, ..settings }).await;
        state.toasts.post(TOAST_PERMISSION_GRANTED);
    } else {
        poller.arm(settings).await;
        state.toasts.post(TOAST_PERMISSION_REFUSED);
    }
    info!("permission:: now {:?}", permission);

    HttpResponse::Ok().json(PermissionData { permission })
}

#[get("/schedule/preview")]
async fn schedule_preview(state: web::Data<AppState>) -> impl Responder {
    let settings = store::load_settings(state.store.as_ref());
    if !settings.notifications_enabled {
        return HttpResponse::Ok().json(PreviewData { times: Vec::new() });
    }

    let mut manager = state.manager.lock().await;
    manager.ensure_today_schedule(&settings);
    HttpResponse::Ok().json(PreviewData { times: manager.schedule_preview() })
}

#[get("/entries")]
async fn list_entries(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(store::load_entries(state.store.as_ref()))
}

#[post("/entries")]
async fn create_entry(payload: web::Json<Answers>,
    state: web::Data<AppState>) -> impl Responder {

    let answers = payload.into_inner();
    let entry = Entry {
        jaw_rest: answers.jaw_rest,
        pain_level: answers.pain_level,
        activity: answers.activity,
        timestamp: state.clock.now().to_rfc3339(),
    };
    store::save_entry(state.store.as_ref(), &entry);
    state.toasts.post(TOAST_ENTRY_SAVED);
    HttpResponse::Created().json(entry)
}

#[get("/stats")]
async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let entries = store::load_entries(state.store.as_ref());
    HttpResponse::Ok().json(compute_stats(&entries, state.clock.now()))
}

#[get("/toast")]
async fn get_toast(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ToastData { message: state.toasts.current() })
}

#[delete("/toast")]
async fn dismiss_toast(state: web::Data<AppState>) -> impl Responder {
    state.toasts.dismiss();
    HttpResponse::NoContent()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use chrono::NaiveDate;
    use serde_json::Value;
    use tokio::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::RecordingNotifier;
    use crate::store::MemoryStore;

    fn state(grant_on_request: bool) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::at(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(), 7, 0);
        let notifier = Arc::new(RecordingNotifier::new(Permission::Default, grant_on_request));
        let state = AppState::new(store.clone(), Arc::new(clock), notifier, Duration::from_secs(60));
        (state, store)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(App::new().app_data(web::Data::new($state.clone())).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn settings_default_then_update_regenerates_schedule() {
        let (state, store) = state(false);
        let app = app!(state);

        let req = test::TestRequest::get().uri("/settings").to_request();
        let settings: Settings = test::call_and_read_body_json(&app, req).await;
        assert_eq!(settings, Settings::default());

        let req = test::TestRequest::put().uri("/settings")
            .set_json(json!({"notificationsEnabled": true, "notificationsPerDay": 99, "startHour": 9, "endHour": 21}))
            .to_request();
        let settings: Settings = test::call_and_read_body_json(&app, req).await;
        assert_eq!(settings.notifications_per_day, 50);
        assert_eq!(store::load_settings(&*store), settings);

        let schedule = store::load_schedule(&*store).unwrap();
        assert_eq!(schedule.times.len(), 50);
        assert!(state.poller.lock().await.is_running());

        let req = test::TestRequest::put().uri("/settings")
            .set_json(json!({"notificationsEnabled": false}))
            .to_request();
        let settings: Settings = test::call_and_read_body_json(&app, req).await;
        assert!(!settings.notifications_enabled);
        assert!(store::load_schedule(&*store).is_none());
        assert!(!state.poller.lock().await.is_running());
    }

    #[actix_web::test]
    async fn partial_update_keeps_stored_fields() {
        let (state, store) = state(false);
        let app = app!(state);
        store::save_settings(&*store, &Settings {
            notifications_enabled: true,
            notifications_per_day: 35,
            start_hour: 10,
            end_hour: 18,
        });

        let req = test::TestRequest::put().uri("/settings")
            .set_json(json!({"notificationsEnabled": false}))
            .to_request();
        let settings: Settings = test::call_and_read_body_json(&app, req).await;
        assert_eq!(settings, Settings {
            notifications_enabled: false,
            notifications_per_day: 35,
            start_hour: 10,
            end_hour: 18,
        });
        assert_eq!(store::load_settings(&*store), settings);

        let req = test::TestRequest::put().uri("/settings")
            .set_json(json!({"endHour": 9}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store::load_settings(&*store), settings);
    }

    #[actix_web::test]
    async fn malformed_settings_are_rejected() {
        let (state, store) = state(false);
        let app = app!(state);

        for body in [json!([1, 2]), json!({"notificationsPerDay": "many"}), json!({"startHour": -1})] {
            let req = test::TestRequest::put().uri("/settings").set_json(body).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(store::load_settings(&*store), Settings::default());
        assert!(!state.poller.lock().await.is_running());
    }

    #[actix_web::test]
    async fn empty_window_is_rejected() {
        let (state, store) = state(false);
        let app = app!(state);

        let req = test::TestRequest::put().uri("/settings")
            .set_json(json!({"notificationsEnabled": true, "startHour": 20, "endHour": 8}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store::load_settings(&*store), Settings::default());
    }

    #[actix_web::test]
    async fn preview_is_empty_while_disabled() {
        let (state, store) = state(false);
        let app = app!(state);

        let req = test::TestRequest::get().uri("/schedule/preview").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["times"], json!([]));
        assert!(store::load_schedule(&*store).is_none());

        store::save_settings(&*store, &Settings { notifications_enabled: true, ..Settings::default() });
        let req = test::TestRequest::get().uri("/schedule/preview").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["times"].as_array().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn granted_permission_enables_notifications() {
        let (state, store) = state(true);
        let app = app!(state);

        let req = test::TestRequest::post().uri("/permission").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["permission"], "granted");
        assert!(store::load_settings(&*store).notifications_enabled);
        assert!(store::load_schedule(&*store).is_some());
        assert_eq!(state.toasts.current().as_deref(), Some(TOAST_PERMISSION_GRANTED));

        state.poller.lock().await.stop().await;
    }

    #[actix_web::test]
    async fn refused_permission_only_toasts() {
        let (state, store) = state(false);
        let app = app!(state);

        let req = test::TestRequest::post().uri("/permission").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["permission"], "denied");
        assert!(!store::load_settings(&*store).notifications_enabled);
        assert_eq!(state.toasts.current().as_deref(), Some(TOAST_PERMISSION_REFUSED));

        let req = test::TestRequest::get().uri("/permission").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["permission"], "denied");
    }

    #[actix_web::test]
    async fn entries_are_stamped_and_counted() {
        let (state, _) = state(false);
        let app = app!(state);

        for answers in [
            json!({"jawRest": "Non", "painLevel": "Modérée", "activity": "Écrans"}),
            json!({"jawRest": "Oui", "painLevel": "Aucune", "activity": "Sport"}),
        ] {
            let req = test::TestRequest::post().uri("/entries").set_json(answers).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/entries").to_request();
        let entries: Vec<Entry> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, state.clock.now().to_rfc3339());
        assert_eq!(entries[0].activity, crate::models::Activity::Sport);

        let req = test::TestRequest::get().uri("/stats").to_request();
        let stats: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["painRatio"], 50);
        assert_eq!(stats["lastWeekCount"], 2);
    }

    #[actix_web::test]
    async fn toast_can_be_read_and_dismissed() {
        let (state, _) = state(false);
        let app = app!(state);
        state.toasts.post(TOAST_ENTRY_SAVED);

        let req = test::TestRequest::get().uri("/toast").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], TOAST_ENTRY_SAVED);

        let req = test::TestRequest::delete().uri("/toast").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.toasts.current(), None);
    }
}
