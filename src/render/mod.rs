pub mod egui_surface;
pub mod plot_interaction;
pub mod surface;
