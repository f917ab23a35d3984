//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in NavBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! Structured values cross the boundary as JSON. Sessions are passed to
//! Kotlin as an opaque `Long` handle obtained from `createSession` and
//! released with `destroySession`. Simulated fixes, camera poses and
//! completion are queued and fetched with `pollEvents`. Nothing here panics
//! across the FFI boundary: failures are logged and surface as `null` /
//! `false` / `0`.

use jni::objects::{JClass, JString};
use jni::sys::{jboolean, jdouble, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use log::error;

use crate::config::NavConfig;
use crate::geo::GeoPoint;
use crate::guidance::CommandEvent;
use crate::host::HostSession;
use crate::session::{NavigationSession, RawLocation};

fn new_jstring(env: &mut JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            error!("Failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

fn read_jstring(env: &mut JNIEnv, value: &JString) -> Option<String> {
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            error!("Failed to read Java string: {e}");
            None
        }
    }
}

/// Borrow the session behind a handle from `createSession`.
///
/// # Safety
/// `handle` must be 0 or a live handle that has not been destroyed.
unsafe fn host<'a>(handle: jlong) -> Option<&'a HostSession> {
    (handle as *const HostSession).as_ref()
}

/// # Safety
/// See [`host`].
unsafe fn session<'a>(handle: jlong) -> Option<&'a NavigationSession> {
    host(handle).map(HostSession::session)
}

fn snapshot_json(env: &mut JNIEnv, session: &NavigationSession) -> jstring {
    match serde_json::to_string(&session.snapshot()) {
        Ok(json) => new_jstring(env, &json),
        Err(e) => {
            error!("Failed to serialize snapshot: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Returns the library version.
/// Maps to: NavBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_version(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    new_jstring(&mut env, crate::VERSION)
}

/// Route `log` output to logcat. Safe to call more than once.
/// Maps to: NavBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("navsim"),
    );
}

/// Maps to: NavBridge.formatDistance(meters: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_formatDistance(
    mut env: JNIEnv,
    _class: JClass,
    meters: jdouble,
) -> jstring {
    new_jstring(&mut env, &crate::format::format_distance(meters))
}

/// Maps to: NavBridge.formatTotalDistance(meters: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_formatTotalDistance(
    mut env: JNIEnv,
    _class: JClass,
    meters: jdouble,
) -> jstring {
    new_jstring(&mut env, &crate::format::format_total_distance(meters))
}

/// Maps to: NavBridge.formatTotalTime(seconds: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_formatTotalTime(
    mut env: JNIEnv,
    _class: JClass,
    seconds: jdouble,
) -> jstring {
    new_jstring(&mut env, &crate::format::format_total_time(seconds))
}

/// Resample a JSON array of `{lon, lat}` points.
/// Maps to: NavBridge.resample(pointsJson: String, spacingMeters: Double) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_resample(
    mut env: JNIEnv,
    _class: JClass,
    points_json: JString,
    spacing_meters: jdouble,
) -> jstring {
    let Some(json) = read_jstring(&mut env, &points_json) else {
        return std::ptr::null_mut();
    };
    let points: Vec<GeoPoint> = match serde_json::from_str(&json) {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid points JSON: {e}");
            return std::ptr::null_mut();
        }
    };
    let resampled = crate::resample::resample(&points, spacing_meters);
    match serde_json::to_string(&resampled) {
        Ok(out) => new_jstring(&mut env, &out),
        Err(e) => {
            error!("Failed to serialize points: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Create a session from a JSON config (`"{}"` for defaults). Returns 0 on
/// failure.
/// Maps to: NavBridge.createSession(configJson: String) -> Long
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_createSession(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jlong {
    let Some(json) = read_jstring(&mut env, &config_json) else {
        return 0;
    };
    let config = match NavConfig::from_json(&json) {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid session config: {e}");
            return 0;
        }
    };
    Box::into_raw(Box::new(HostSession::new(config))) as jlong
}

/// Maps to: NavBridge.destroySession(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_destroySession(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: handle came from createSession and Kotlin releases it once
        drop(unsafe { Box::from_raw(handle as *mut HostSession) });
    }
}

/// Maps to: NavBridge.setRouteFromGpx(handle: Long, gpxXml: String) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_setRouteFromGpx(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    gpx_xml: JString,
) -> jboolean {
    // SAFETY: see `session`
    let Some(session) = (unsafe { session(handle) }) else {
        return JNI_FALSE;
    };
    let Some(xml) = read_jstring(&mut env, &gpx_xml) else {
        return JNI_FALSE;
    };
    match session.load_gpx_route(&xml) {
        Ok(true) => JNI_TRUE,
        Ok(false) => JNI_FALSE,
        Err(e) => {
            error!("Failed to load GPX route: {e}");
            JNI_FALSE
        }
    }
}

/// Apply a command event and return the resulting snapshot.
/// Maps to: NavBridge.handleEvent(handle: Long, eventJson: String) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_handleEvent(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    event_json: JString,
) -> jstring {
    // SAFETY: see `session`
    let Some(session) = (unsafe { session(handle) }) else {
        return std::ptr::null_mut();
    };
    let Some(json) = read_jstring(&mut env, &event_json) else {
        return std::ptr::null_mut();
    };
    match serde_json::from_str::<CommandEvent>(&json) {
        Ok(event) => session.handle_event(event),
        Err(e) => error!("Invalid command event: {e}"),
    }
    snapshot_json(&mut env, session)
}

/// Feed a device fix. NaN speed or direction means "not reported".
/// Maps to: NavBridge.onLocation(handle: Long, lon: Double, lat: Double,
/// speedMps: Double, direction: Double) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_onLocation(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lon: jdouble,
    lat: jdouble,
    speed_mps: jdouble,
    direction: jdouble,
) -> jstring {
    // SAFETY: see `session`
    let Some(session) = (unsafe { session(handle) }) else {
        return std::ptr::null_mut();
    };
    session.on_location(RawLocation {
        position: GeoPoint::new(lon, lat),
        speed_mps: Some(speed_mps).filter(|v| v.is_finite()),
        direction: Some(direction).filter(|v| v.is_finite()),
    });
    snapshot_json(&mut env, session)
}

/// Maps to: NavBridge.snapshot(handle: Long) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_snapshot(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    // SAFETY: see `session`
    let Some(session) = (unsafe { session(handle) }) else {
        return std::ptr::null_mut();
    };
    snapshot_json(&mut env, session)
}

/// Start simulating the active route. False if there is no usable route or
/// a simulation is already running.
/// Maps to: NavBridge.startSimulation(handle: Long) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_startSimulation(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    // SAFETY: see `host`
    let Some(host) = (unsafe { host(handle) }) else {
        return JNI_FALSE;
    };
    match host.start_simulation() {
        Ok(()) => JNI_TRUE,
        Err(e) => {
            error!("Failed to start simulation: {e}");
            JNI_FALSE
        }
    }
}

/// Maps to: NavBridge.stopSimulation(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_stopSimulation(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    // SAFETY: see `session`
    if let Some(session) = unsafe { session(handle) } {
        session.stop_simulation();
    }
}

/// Maps to: NavBridge.isSimulationRunning(handle: Long) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_isSimulationRunning(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    // SAFETY: see `session`
    match unsafe { session(handle) } {
        Some(session) if session.is_simulation_running() => JNI_TRUE,
        _ => JNI_FALSE,
    }
}

/// Maps to: NavBridge.setFollowEnabled(handle: Long, enabled: Boolean)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_setFollowEnabled(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    enabled: jboolean,
) {
    // SAFETY: see `session`
    if let Some(session) = unsafe { session(handle) } {
        session.set_follow_enabled(enabled != JNI_FALSE);
    }
}

/// Drain queued outputs as a JSON array of `{"type": ...}` events.
/// Maps to: NavBridge.pollEvents(handle: Long) -> String?
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navsim_app_NavBridge_pollEvents(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    // SAFETY: see `host`
    let Some(host) = (unsafe { host(handle) }) else {
        return std::ptr::null_mut();
    };
    match host.poll_json() {
        Ok(json) => new_jstring(&mut env, &json),
        Err(e) => {
            error!("Failed to serialize events: {e}");
            std::ptr::null_mut()
        }
    }
}
