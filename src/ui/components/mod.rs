pub mod chart;
pub mod dashboard;
pub mod exam_view;
pub mod generator_form;
pub mod menu;
pub mod mistake_list;
pub mod progress_bar;
pub mod result_view;
