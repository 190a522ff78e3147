mod app;

use std::path::PathBuf;

use app::KinoscopeApp;
use eframe::egui;
use eframe::egui_wgpu;
use kinoscope::ViewerConfig;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ViewerConfig::discover(std::env::args().nth(1).map(PathBuf::from));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Kinoscope")
            .with_inner_size([1200.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        // Configure wgpu for driver stability on Windows.
        wgpu_options: egui_wgpu::WgpuConfiguration {
            present_mode: eframe::wgpu::PresentMode::AutoVsync,
            wgpu_setup: egui_wgpu::WgpuSetup::CreateNew(egui_wgpu::WgpuSetupCreateNew {
                instance_descriptor: eframe::wgpu::InstanceDescriptor {
                    backends: eframe::wgpu::Backends::DX12
                        | eframe::wgpu::Backends::VULKAN
                        | eframe::wgpu::Backends::GL,
                    ..Default::default()
                },
                power_preference: eframe::wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    eframe::run_native(
        "Kinoscope",
        options,
        Box::new(|cc| Ok(Box::new(KinoscopeApp::new(cc, config)))),
    )
}
