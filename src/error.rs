use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParserError>;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Неверный формат VIN кода. Должно быть 17 символов.")]
    InvalidVinFormat { vin: String },

    #[error("Ошибка при запросе: {status}")]
    Upstream { status: u16 },

    #[error("Сетевая ошибка: {0}")]
    Transport(String),

    #[error("Ошибка разбора ответа: {0}")]
    Parse(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ParserError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_vin_message_is_user_facing() {
        let err = ParserError::InvalidVinFormat {
            vin: "SHORT".to_string(),
        };
        assert!(err.to_string().starts_with("Неверный формат"));
    }

    #[test]
    fn upstream_carries_status() {
        let err = ParserError::Upstream { status: 503 };
        assert_eq!(err.to_string(), "Ошибка при запросе: 503");
    }
}
