use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Фильтр по умолчанию, если RUST_LOG не задан
pub const DEFAULT_FILTER: &str = "warn,tts_script=info";

/// Инициализация логгера
///
/// `filter` переопределяет RUST_LOG (например, значение `--log-level` из CLI).
/// Повторный вызов ничего не делает.
pub fn init_logger(filter: Option<&str>) {
    let mut builder = match filter {
        Some(filter) => {
            let mut builder = Builder::new();
            builder.parse_filters(filter);
            builder
        }
        None => Builder::from_env(Env::default().filter_or("RUST_LOG", DEFAULT_FILTER)),
    };

    // Подавляем шум от рантайма
    builder
        .filter_module("mio", LevelFilter::Error)
        .filter_module("tokio_util", LevelFilter::Error)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);

    let _ = builder.try_init();
}
