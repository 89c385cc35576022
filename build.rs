fn main() {
    // The Tauri context (tauri.conf.json, frontend dist) is only needed by the desktop host.
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
