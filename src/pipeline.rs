//! Feature pipeline
//!
//! A [`FeaturePipeline`] owns an indicator source and a [`PipelineConfig`] and
//! exposes every transform as a method taking and returning a table together
//! with its [`FeatureMetadata`]. Steps can also be described as text and run
//! in sequence:
//!
//! ```text
//! close-pct            -> pct:Close
//! direction:Close      -> Close-pct (if missing) and Close-direction
//! ma:ema:10:ohlc       -> EMA_10, EMA_10_CHANGE and four OHLC distances
//! bbands:Close         -> BB_UP, BB_MID, BB_LOW and Close_BB_*_Diff
//! spread:wma5:wma20    -> WMA_5_WMA_20_Diff
//! ```

use crate::config::PipelineConfig;
use crate::error::{FeatureError, Result};
use crate::indicators::IndicatorSource;
use crate::metadata::{FeatureMetadata, Transformed};
use crate::split::split_data;
use crate::transforms::moving_average::{
    self, MovingAverage, MovingAverageKind, EMA_10, EMA_30, SMA_20, SMA_200, WMA_20, WMA_5, WMA_60,
};
use crate::transforms::{basic, direction, ohlc, technical, volatility, DiffMode};
use crate::types::{Ticker, CLOSE, DATE};
use polars::prelude::DataFrame;
use std::str::FromStr;

/// One feature transform, parsed from `name[:arg[:arg]]`
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureStep {
    /// `pct:<col>` or `close-pct`
    PercentChange(String),
    /// `abs-pct:<col>`
    AbsPercentChange(String),
    /// `prev:<col>:<count>`
    PreviousValues { column: String, count: usize },
    /// `next-y:<col>[:<periods>]`
    NextY { column: String, periods: usize },
    /// `close-only`
    CloseOnly,
    /// `datepart[:<col>]`
    DatePart(String),
    /// `direction:<col>`
    Direction(String),
    /// `volatility:<col>`
    Volatility(String),
    /// `ohlc-avg[:ohlc|:<col>]`
    OhlcAverage(DiffMode),
    /// `ma:<kind>:<period>[:ohlc|:<col>]`
    MovingAverage { average: MovingAverage, mode: DiffMode },
    /// `spread:<fast>:<slow>[:ohlc|:<col>]` with averages written as `wma5`,
    /// or the fixed spreads `wma5-wma20`, `wma20-wma60`, `ema10-ema30` and
    /// `sma20-sma200`
    Spread {
        fast: MovingAverage,
        slow: MovingAverage,
        mode: DiffMode,
    },
    /// `adx[:change]`
    Adx { change: bool },
    /// `obv[:change]`
    Obv { change: bool },
    /// `mom[:change]`
    Mom { change: bool },
    /// `rsi[:change]`
    Rsi { change: bool },
    /// `macd`
    Macd,
    /// `bbands[:ohlc|:<col>]`
    Bbands(DiffMode),
    /// `fill-nan`
    FillNan,
}

fn parse_mode(arg: Option<&str>) -> DiffMode {
    match arg {
        None => DiffMode::None,
        Some(arg) if arg.eq_ignore_ascii_case("ohlc") => DiffMode::Ohlc,
        Some(column) => DiffMode::Column(column.to_string()),
    }
}

fn parse_number<T: FromStr>(step: &str, arg: Option<&str>) -> Result<T> {
    let arg = arg.ok_or_else(|| FeatureError::InvalidStep(format!("{}: missing number", step)))?;
    arg.parse()
        .map_err(|_| FeatureError::InvalidStep(format!("{}: '{}' is not a valid number", step, arg)))
}

fn parse_column(step: &str, arg: Option<&str>) -> Result<String> {
    arg.map(str::to_string)
        .ok_or_else(|| FeatureError::InvalidStep(format!("{}: missing column", step)))
}

fn parse_change(step: &str, arg: Option<&str>) -> Result<bool> {
    match arg {
        None => Ok(false),
        Some(flag) if flag.eq_ignore_ascii_case("change") => Ok(true),
        Some(other) => Err(FeatureError::InvalidStep(format!("{}: unexpected argument '{}'", step, other))),
    }
}

/// Parse a compact moving average such as `ema10`
fn parse_average(step: &str, text: Option<&str>) -> Result<MovingAverage> {
    let text = text.ok_or_else(|| FeatureError::InvalidStep(format!("{}: missing moving average", step)))?;
    let split = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| FeatureError::InvalidStep(format!("{}: '{}' has no period", step, text)))?;
    let (tag, period) = text.split_at(split);
    Ok(MovingAverage::new(MovingAverageKind::from_tag(tag), parse_number(step, Some(period))?))
}

impl FromStr for FeatureStep {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut parts = s.split(':').map(str::trim);
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();
        let arg = |i: usize| args.get(i).copied().filter(|a| !a.is_empty());

        let fixed_spread = |fast, slow| FeatureStep::Spread {
            fast,
            slow,
            mode: parse_mode(arg(0)),
        };

        let step = match name.as_str() {
            "pct" => FeatureStep::PercentChange(parse_column(s, arg(0))?),
            "close-pct" => FeatureStep::PercentChange(CLOSE.to_string()),
            "abs-pct" => FeatureStep::AbsPercentChange(parse_column(s, arg(0))?),
            "prev" => FeatureStep::PreviousValues {
                column: parse_column(s, arg(0))?,
                count: parse_number(s, arg(1))?,
            },
            "next-y" => FeatureStep::NextY {
                column: parse_column(s, arg(0))?,
                periods: arg(1).map_or(Ok(1), |p| parse_number(s, Some(p)))?,
            },
            "close-only" => FeatureStep::CloseOnly,
            "datepart" => FeatureStep::DatePart(arg(0).unwrap_or(DATE).to_string()),
            "direction" => FeatureStep::Direction(parse_column(s, arg(0))?),
            "volatility" => FeatureStep::Volatility(parse_column(s, arg(0))?),
            "ohlc-avg" => FeatureStep::OhlcAverage(parse_mode(arg(0))),
            "ma" => FeatureStep::MovingAverage {
                average: MovingAverage::new(
                    MovingAverageKind::from_tag(arg(0).unwrap_or_default()),
                    arg(1).map_or(Ok(20), |p| parse_number(s, Some(p)))?,
                ),
                mode: parse_mode(arg(2)),
            },
            "spread" => FeatureStep::Spread {
                fast: parse_average(s, arg(0))?,
                slow: parse_average(s, arg(1))?,
                mode: parse_mode(arg(2)),
            },
            "wma5-wma20" => fixed_spread(WMA_5, WMA_20),
            "wma20-wma60" => fixed_spread(WMA_20, WMA_60),
            "ema10-ema30" => fixed_spread(EMA_10, EMA_30),
            "sma20-sma200" => match arg(0) {
                None => fixed_spread(SMA_20, SMA_200),
                Some(flag) if flag.eq_ignore_ascii_case("ohlc") => fixed_spread(SMA_20, SMA_200),
                Some(other) => {
                    return Err(FeatureError::InvalidStep(format!(
                        "{}: only 'ohlc' distances are supported, got '{}'",
                        s, other
                    )))
                }
            },
            "adx" => FeatureStep::Adx { change: parse_change(s, arg(0))? },
            "obv" => FeatureStep::Obv { change: parse_change(s, arg(0))? },
            "mom" => FeatureStep::Mom { change: parse_change(s, arg(0))? },
            "rsi" => FeatureStep::Rsi { change: parse_change(s, arg(0))? },
            "macd" => FeatureStep::Macd,
            "bbands" => FeatureStep::Bbands(parse_mode(arg(0))),
            "fill-nan" => FeatureStep::FillNan,
            _ => return Err(FeatureError::InvalidStep(s.to_string())),
        };
        Ok(step)
    }
}

/// Parse a list of step descriptions
pub fn parse_steps<I, T>(steps: I) -> Result<Vec<FeatureStep>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    steps.into_iter().map(|s| s.as_ref().parse()).collect()
}

/// Feature pipeline over one indicator source
#[derive(Debug, Clone)]
pub struct FeaturePipeline<S: IndicatorSource> {
    source: S,
    config: PipelineConfig,
}

impl<S: IndicatorSource> FeaturePipeline<S> {
    /// Create a pipeline after validating the configuration
    pub fn new(source: S, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    /// Create a pipeline with the default configuration
    pub fn with_defaults(source: S) -> Self {
        Self {
            source,
            config: PipelineConfig::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Verbose facts go to info level when enabled, to debug otherwise
    fn report(&self, message: std::fmt::Arguments<'_>) {
        if self.config.verbose {
            log::info!("{}", message);
        } else {
            log::debug!("{}", message);
        }
    }

    fn report_merge(&self, label: &str, rows_before: usize, result: Result<Transformed>) -> Result<Transformed> {
        let (df, meta) = result?;
        self.report(format_args!(
            "Merged {}: {} rows before, {} rows after",
            label,
            rows_before,
            df.height()
        ));
        if df.height() < rows_before {
            log::warn!("{} dropped {} rows without a matching date", label, rows_before - df.height());
        }
        Ok((df, meta))
    }

    pub fn add_moving_average(
        &self,
        df: DataFrame,
        meta: FeatureMetadata,
        ticker: &Ticker,
        average: MovingAverage,
        mode: &DiffMode,
    ) -> Result<Transformed> {
        let rows = df.height();
        let result = moving_average::add_moving_average(df, meta, &self.source, ticker, average, mode);
        self.report_merge(&average.column_name(), rows, result)
    }

    pub fn add_moving_average_spread(
        &self,
        df: DataFrame,
        meta: FeatureMetadata,
        ticker: &Ticker,
        fast: MovingAverage,
        slow: MovingAverage,
        mode: &DiffMode,
    ) -> Result<Transformed> {
        let rows = df.height();
        let result = moving_average::add_moving_average_spread(df, meta, &self.source, ticker, fast, slow, mode);
        self.report_merge(&moving_average::spread_column_name(fast, slow), rows, result)
    }

    pub fn add_wma5_wma20_diff(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, mode: &DiffMode) -> Result<Transformed> {
        let rows = df.height();
        let result = moving_average::add_wma5_wma20_diff(df, meta, &self.source, ticker, mode);
        self.report_merge(&moving_average::spread_column_name(WMA_5, WMA_20), rows, result)
    }

    pub fn add_wma20_wma60_diff(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, mode: &DiffMode) -> Result<Transformed> {
        let rows = df.height();
        let result = moving_average::add_wma20_wma60_diff(df, meta, &self.source, ticker, mode);
        self.report_merge(&moving_average::spread_column_name(WMA_20, WMA_60), rows, result)
    }

    pub fn add_ema10_ema30_diff(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, mode: &DiffMode) -> Result<Transformed> {
        let rows = df.height();
        let result = moving_average::add_ema10_ema30_diff(df, meta, &self.source, ticker, mode);
        self.report_merge(&moving_average::spread_column_name(EMA_10, EMA_30), rows, result)
    }

    pub fn add_sma20_sma200_diff(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, add_ohlc_diff: bool) -> Result<Transformed> {
        let rows = df.height();
        let result = moving_average::add_sma20_sma200_diff(df, meta, &self.source, ticker, add_ohlc_diff);
        self.report_merge(&moving_average::spread_column_name(SMA_20, SMA_200), rows, result)
    }

    pub fn add_adx(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, change: bool) -> Result<Transformed> {
        let rows = df.height();
        let result = technical::add_adx(df, meta, &self.source, ticker, self.config.indicator_period, change);
        self.report_merge("ADX", rows, result)
    }

    pub fn add_obv(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, change: bool) -> Result<Transformed> {
        let rows = df.height();
        let result = technical::add_obv(df, meta, &self.source, ticker, self.config.indicator_period, change);
        self.report_merge("OBV", rows, result)
    }

    pub fn add_mom(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, change: bool) -> Result<Transformed> {
        let rows = df.height();
        let result = technical::add_mom(df, meta, &self.source, ticker, self.config.indicator_period, change);
        self.report_merge("MOM", rows, result)
    }

    pub fn add_rsi(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, change: bool) -> Result<Transformed> {
        let rows = df.height();
        let result = technical::add_rsi(df, meta, &self.source, ticker, self.config.indicator_period, change);
        self.report_merge("RSI", rows, result)
    }

    pub fn add_macd(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker) -> Result<Transformed> {
        let rows = df.height();
        let result = technical::add_macd(df, meta, &self.source, ticker, self.config.indicator_period);
        self.report_merge("MACD", rows, result)
    }

    pub fn add_bbands(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, mode: &DiffMode) -> Result<Transformed> {
        let rows = df.height();
        let result = technical::add_bbands(df, meta, &self.source, ticker, self.config.indicator_period, mode);
        self.report_merge("BBANDS", rows, result)
    }

    /// Direction labels with the configured noise threshold
    pub fn add_direction(&self, df: DataFrame, meta: FeatureMetadata, column: &str) -> Result<Transformed> {
        let (df, meta) = direction::add_direction(df, meta, column, self.config.noise_threshold)?;
        let name = direction::direction_column_name(column);
        let labeled = df.height() - df.column(&name)?.null_count();
        self.report(format_args!("{}: {} of {} rows labeled", name, labeled, df.height()));
        Ok((df, meta))
    }

    /// Volatility over the configured number of lags
    pub fn add_volatility(&self, df: DataFrame, meta: FeatureMetadata, column: &str) -> Result<Transformed> {
        volatility::add_volatility(df, meta, column, self.config.volatility_window)
    }

    /// Min-max scale to the configured maximum, keeping `exclude` unchanged
    pub fn normalize(&self, df: DataFrame, exclude: &[&str]) -> Result<DataFrame> {
        basic::min_max_normalize(df, self.config.max_scale, exclude)
    }

    /// Split by the configured ratio
    pub fn split(&self, df: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        let (train, test) = split_data(df, self.config.split_ratio)?;
        self.report(format_args!(
            "Observations: {}, training: {}, testing: {}",
            df.height(),
            train.height(),
            test.height()
        ));
        Ok((train, test))
    }

    /// Apply a single step
    pub fn apply(&self, df: DataFrame, meta: FeatureMetadata, ticker: &Ticker, step: &FeatureStep) -> Result<Transformed> {
        match step {
            FeatureStep::PercentChange(column) => basic::add_percent_change(df, meta, column),
            FeatureStep::AbsPercentChange(column) => basic::add_abs_percent_change(df, meta, column),
            FeatureStep::PreviousValues { column, count } => basic::add_previous_values(df, meta, column, *count),
            FeatureStep::NextY { column, periods } => basic::add_next_y(df, meta, column, *periods),
            FeatureStep::CloseOnly => basic::close_only(df, meta),
            FeatureStep::DatePart(column) => basic::add_datepart(df, meta, column),
            FeatureStep::Direction(column) => self.add_direction(df, meta, column),
            FeatureStep::Volatility(column) => self.add_volatility(df, meta, column),
            FeatureStep::OhlcAverage(mode) => ohlc::add_ohlc_avg(df, meta, mode),
            FeatureStep::MovingAverage { average, mode } => self.add_moving_average(df, meta, ticker, *average, mode),
            FeatureStep::Spread { fast, slow, mode } => {
                self.add_moving_average_spread(df, meta, ticker, *fast, *slow, mode)
            }
            FeatureStep::Adx { change } => self.add_adx(df, meta, ticker, *change),
            FeatureStep::Obv { change } => self.add_obv(df, meta, ticker, *change),
            FeatureStep::Mom { change } => self.add_mom(df, meta, ticker, *change),
            FeatureStep::Rsi { change } => self.add_rsi(df, meta, ticker, *change),
            FeatureStep::Macd => self.add_macd(df, meta, ticker),
            FeatureStep::Bbands(mode) => self.add_bbands(df, meta, ticker, mode),
            FeatureStep::FillNan => Ok((basic::fill_nan(df)?, meta)),
        }
    }

    /// Run steps in order, starting from empty metadata
    pub fn run(&self, df: DataFrame, ticker: &Ticker, steps: &[FeatureStep]) -> Result<Transformed> {
        let mut state = (df, FeatureMetadata::new());
        for step in steps {
            let (df, meta) = state;
            state = self.apply(df, meta, ticker, step)?;
            self.report(format_args!(
                "{:?}: {} rows, {} columns, {} features",
                step,
                state.0.height(),
                state.0.width(),
                state.1.len()
            ));
        }
        Ok(state)
    }

    /// Run the steps listed in the configuration
    pub fn run_configured(&self, df: DataFrame, ticker: &Ticker) -> Result<Transformed> {
        let steps = parse_steps(&self.config.steps)?;
        self.run(df, ticker, &steps)
    }
}
