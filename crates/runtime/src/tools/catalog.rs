//! Market data tool catalog.
//!
//! A fixed table of tools, each bound to one upstream [`Function`]. The
//! table is the single place that maps the name a model emits to what
//! actually gets requested.

use std::collections::HashMap;

use market::{Function, ParamValue, Params, QuoteApi, resolve_symbol};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::model::{ToolCall, ToolSpec};
use crate::tools::{ToolError, ToolHost};

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
}

impl ParamKind {
    fn schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// Value sent upstream when the model leaves a parameter out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Text(&'static str),
    Integer(i64),
}

impl ParamDefault {
    fn to_param(self) -> ParamValue {
        match self {
            Self::Text(s) => ParamValue::from(s),
            Self::Integer(n) => ParamValue::from(n),
        }
    }

    fn to_json(self) -> Value {
        match self {
            Self::Text(s) => json!(s),
            Self::Integer(n) => json!(n),
        }
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamDefault>,
    pub description: &'static str,
}

impl ParamDef {
    const fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::String,
            required: false,
            default: None,
            description,
        }
    }

    const fn integer(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
            required: false,
            default: None,
            description,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn or_text(mut self, value: &'static str) -> Self {
        self.default = Some(ParamDefault::Text(value));
        self
    }

    const fn or_integer(mut self, value: i64) -> Self {
        self.default = Some(ParamDefault::Integer(value));
        self
    }
}

/// How a tool identifies the instrument it queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolBinding {
    /// `from_symbol` and `to_symbol` are sent separately, both required.
    Pair,
    /// A single `symbol`, given directly or built from `from_symbol`/`to_symbol`.
    Resolved,
    /// No instrument parameter.
    None,
}

/// Parameter names consumed by symbol resolution rather than forwarded as-is.
const SYMBOL_PARAMS: [&str; 3] = ["symbol", "from_symbol", "to_symbol"];

/// A catalog entry binding a tool name to an upstream function.
#[derive(Debug, Clone, Copy)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub function: Function,
    pub symbol: SymbolBinding,
    pub params: &'static [ParamDef],
}

impl ToolDefinition {
    /// The model-facing specification with a JSON Schema for the inputs.
    pub fn spec(&self) -> ToolSpec {
        let mut properties = Map::new();
        for param in self.params {
            let mut property = json!({
                "type": param.kind.schema_type(),
                "description": param.description,
            });
            if let Some(default) = param.default {
                property["default"] = default.to_json();
            }
            properties.insert(param.name.to_string(), property);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        ToolSpec {
            name: self.name.to_string(),
            description: self.description.to_string(),
            schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Turn model-supplied arguments into upstream query parameters.
    ///
    /// Symbol resolution runs first so that a call without instrument
    /// information fails before anything else is looked at.
    pub fn build_params(&self, input: &Value) -> Result<Params, ToolError> {
        let empty = Map::new();
        let args = input.as_object().unwrap_or(&empty);
        let text = |name: &str| args.get(name).and_then(Value::as_str);

        let mut params = Params::new();
        match self.symbol {
            SymbolBinding::Pair => {
                let from = text("from_symbol").map(str::trim).filter(|s| !s.is_empty());
                let to = text("to_symbol").map(str::trim).filter(|s| !s.is_empty());
                let (Some(from), Some(to)) = (from, to) else {
                    return Err(ToolError::MissingSymbol);
                };
                params.insert("from_symbol", from.to_uppercase());
                params.insert("to_symbol", to.to_uppercase());
            }
            SymbolBinding::Resolved => {
                let symbol =
                    resolve_symbol(text("symbol"), text("from_symbol"), text("to_symbol"))
                        .ok_or(ToolError::MissingSymbol)?;
                params.insert("symbol", symbol);
            }
            SymbolBinding::None => {}
        }

        for param in self
            .params
            .iter()
            .filter(|p| !SYMBOL_PARAMS.contains(&p.name))
        {
            let supplied = match args.get(param.name) {
                Some(value) => match param.kind {
                    ParamKind::String => ParamValue::from_json(param.name, value)?,
                    ParamKind::Integer => ParamValue::integer_from_json(param.name, value)?,
                },
                None => None,
            };
            if let Some(value) = supplied.or_else(|| param.default.map(ParamDefault::to_param)) {
                params.insert(param.name, value);
            }
        }

        Ok(params)
    }
}

const FROM_SYMBOL: ParamDef =
    ParamDef::string("from_symbol", "Base currency code, e.g. \"EUR\"").required();
const TO_SYMBOL: ParamDef =
    ParamDef::string("to_symbol", "Quote currency code, e.g. \"USD\"").required();

const SYMBOL: ParamDef = ParamDef::string(
    "symbol",
    "Instrument symbol, e.g. \"EURUSD\". Alternatively pass from_symbol and to_symbol.",
);
const PAIR_FROM: ParamDef = ParamDef::string(
    "from_symbol",
    "Base currency code, used with to_symbol when symbol is omitted",
);
const PAIR_TO: ParamDef = ParamDef::string(
    "to_symbol",
    "Quote currency code, used with from_symbol when symbol is omitted",
);

const INTERVAL: ParamDef = ParamDef::string(
    "interval",
    "1min, 5min, 15min, 30min, 60min, daily, weekly or monthly",
)
.or_text("daily");
const SERIES_TYPE: ParamDef =
    ParamDef::string("series_type", "Price field: close, open, high or low").or_text("close");

const fn time_period(default: i64) -> ParamDef {
    ParamDef::integer("time_period", "Number of data points per calculation").or_integer(default)
}

const FX_PAIR: &[ParamDef] = &[FROM_SYMBOL, TO_SYMBOL];

/// Every tool the agent can call.
pub static CATALOG: &[ToolDefinition] = &[
    ToolDefinition {
        name: "get_fx_daily",
        description: "Daily open/high/low/close series for a currency pair.",
        function: Function::FxDaily,
        symbol: SymbolBinding::Pair,
        params: FX_PAIR,
    },
    ToolDefinition {
        name: "get_fx_intraday",
        description: "Intraday open/high/low/close series for a currency pair.",
        function: Function::FxIntraday,
        symbol: SymbolBinding::Pair,
        params: &[
            FROM_SYMBOL,
            TO_SYMBOL,
            ParamDef::string("interval", "1min, 5min, 15min, 30min or 60min").or_text("5min"),
        ],
    },
    ToolDefinition {
        name: "get_fx_weekly",
        description: "Weekly open/high/low/close series for a currency pair.",
        function: Function::FxWeekly,
        symbol: SymbolBinding::Pair,
        params: FX_PAIR,
    },
    ToolDefinition {
        name: "get_fx_monthly",
        description: "Monthly open/high/low/close series for a currency pair.",
        function: Function::FxMonthly,
        symbol: SymbolBinding::Pair,
        params: FX_PAIR,
    },
    ToolDefinition {
        name: "get_news_sentiment",
        description: "Market news with per-article and per-ticker sentiment scores.",
        function: Function::NewsSentiment,
        symbol: SymbolBinding::None,
        params: &[
            ParamDef::string("tickers", "Comma-separated tickers, e.g. \"FOREX:EUR,FOREX:USD\""),
            ParamDef::string("topics", "Comma-separated topics, e.g. \"economy_monetary\""),
            ParamDef::string("time_from", "Start time as YYYYMMDDTHHMM"),
            ParamDef::string("time_to", "End time as YYYYMMDDTHHMM"),
            ParamDef::integer("limit", "Maximum number of articles").or_integer(50),
        ],
    },
    ToolDefinition {
        name: "get_sma",
        description: "Simple moving average.",
        function: Function::Sma,
        symbol: SymbolBinding::Resolved,
        params: &[SYMBOL, PAIR_FROM, PAIR_TO, INTERVAL, time_period(10), SERIES_TYPE],
    },
    ToolDefinition {
        name: "get_ema",
        description: "Exponential moving average.",
        function: Function::Ema,
        symbol: SymbolBinding::Resolved,
        params: &[SYMBOL, PAIR_FROM, PAIR_TO, INTERVAL, time_period(10), SERIES_TYPE],
    },
    ToolDefinition {
        name: "get_macd",
        description: "Moving average convergence/divergence with signal line and histogram.",
        function: Function::Macd,
        symbol: SymbolBinding::Resolved,
        params: &[
            SYMBOL,
            PAIR_FROM,
            PAIR_TO,
            INTERVAL,
            SERIES_TYPE,
            ParamDef::integer("fastperiod", "Fast EMA period"),
            ParamDef::integer("slowperiod", "Slow EMA period"),
            ParamDef::integer("signalperiod", "Signal line period"),
        ],
    },
    ToolDefinition {
        name: "get_rsi",
        description: "Relative strength index.",
        function: Function::Rsi,
        symbol: SymbolBinding::Resolved,
        params: &[SYMBOL, PAIR_FROM, PAIR_TO, INTERVAL, time_period(14), SERIES_TYPE],
    },
    ToolDefinition {
        name: "get_adx",
        description: "Average directional movement index (trend strength).",
        function: Function::Adx,
        symbol: SymbolBinding::Resolved,
        params: &[SYMBOL, PAIR_FROM, PAIR_TO, INTERVAL, time_period(14)],
    },
    ToolDefinition {
        name: "get_bbands",
        description: "Bollinger bands (upper, middle and lower band).",
        function: Function::Bbands,
        symbol: SymbolBinding::Resolved,
        params: &[
            SYMBOL,
            PAIR_FROM,
            PAIR_TO,
            INTERVAL,
            time_period(20),
            SERIES_TYPE,
            ParamDef::integer("nbdevup", "Standard deviation multiplier for the upper band"),
            ParamDef::integer("nbdevdn", "Standard deviation multiplier for the lower band"),
            ParamDef::integer("matype", "Moving average type, 0 = SMA"),
        ],
    },
];

/// Tool host serving [`CATALOG`] against a quote source.
pub struct MarketTools<C> {
    client: C,
    specs: Vec<ToolSpec>,
    index: HashMap<&'static str, &'static ToolDefinition>,
}

impl<C: QuoteApi> MarketTools<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            specs: CATALOG.iter().map(ToolDefinition::spec).collect(),
            index: CATALOG.iter().map(|def| (def.name, def)).collect(),
        }
    }

    /// Look up a catalog entry by tool name.
    pub fn definition(&self, name: &str) -> Option<&'static ToolDefinition> {
        self.index.get(name).copied()
    }
}

impl<C: QuoteApi> ToolHost for MarketTools<C> {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let definition = self
            .definition(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        let params = definition.build_params(&call.input)?;
        debug!(tool = definition.name, function = %definition.function, "dispatching tool");

        Ok(self.client.invoke(definition.function, &params).await?)
    }
}
