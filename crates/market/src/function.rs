use std::fmt;

/// Upstream function codes understood by the data API.
///
/// The `function` query parameter selects which series or indicator the
/// API computes. Only codes with a catalog binding exist here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    FxDaily,
    FxIntraday,
    FxWeekly,
    FxMonthly,
    NewsSentiment,
    Sma,
    Ema,
    Macd,
    Rsi,
    Adx,
    Bbands,
}

impl Function {
    /// The wire code sent as `function=<code>`.
    pub fn code(self) -> &'static str {
        match self {
            Self::FxDaily => "FX_DAILY",
            Self::FxIntraday => "FX_INTRADAY",
            Self::FxWeekly => "FX_WEEKLY",
            Self::FxMonthly => "FX_MONTHLY",
            Self::NewsSentiment => "NEWS_SENTIMENT",
            Self::Sma => "SMA",
            Self::Ema => "EMA",
            Self::Macd => "MACD",
            Self::Rsi => "RSI",
            Self::Adx => "ADX",
            Self::Bbands => "BBANDS",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
