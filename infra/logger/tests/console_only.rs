use herald_logger::{LevelFilter, Logger};

#[test]
fn console_only_logger_has_no_guard() {
    let logger = Logger::builder()
        .name("herald-console-only")
        .console(true)
        .level(LevelFilter::INFO)
        .verbose_flag("/nonexistent/herald_notification_center_debug")
        .init()
        .expect("logger should initialize");

    assert!(logger.guard().is_none(), "console-only logger should not create a file guard");
    assert!(!logger.is_verbose());
    assert_eq!(logger.level(), LevelFilter::INFO);
}
