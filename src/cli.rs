//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::null_chart_adapter::NullChartAdapter;
use crate::adapters::svg_chart_adapter::SvgChartAdapter;
use crate::adapters::yahoo_adapter::{RetryPolicy, YahooAdapter};
use crate::domain::chart::{BarChart, LineChart, LineSeries, ScatterChart};
use crate::domain::config::{
    CapmConfig, ChartConfig, ChartRenderer, DataConfig, DataSource, NashConfig, PortfolioConfig,
};
use crate::domain::error::QuantError;
use crate::domain::game::{Game, Selection};
use crate::domain::portfolio::{capm_beta, capm_expected_return, portfolio_returns, PortfolioAnalysis};
use crate::domain::price::{PriceSeries, PriceTable};
use crate::domain::regression::linregress;
use crate::domain::returns::{align_returns, to_returns, Frequency, ReturnPoint, ReturnSeries};
use crate::domain::stats::{mean, sample_std_dev, ComparativeStats};
use crate::ports::chart_port::ChartPort;
use crate::ports::data_port::PriceDataPort;
use crate::report::{CapmReport, NashReport, PortfolioReport};

/// Ticker used for the weighted portfolio return series.
pub const PORTFOLIO_LABEL: &str = "Portfolio";

#[derive(Parser, Debug)]
#[command(name = "quantwork", about = "CAPM regression, portfolio risk and Nash equilibria")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// INI file; missing keys fall back to the reference run
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Price source, overriding [data] source
    #[arg(long, value_enum, global = true)]
    pub source: Option<SourceArg>,

    /// Directory of <TICKER>.csv files, overriding [data] csv_dir
    #[arg(long, global = true)]
    pub csv_dir: Option<PathBuf>,

    /// Chart renderer, overriding [charts] renderer
    #[arg(long, value_enum, global = true)]
    pub charts: Option<ChartsArg>,

    /// Directory for SVG charts, overriding [charts] output_dir
    #[arg(long, global = true)]
    pub chart_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regress a stock's returns on a market index (beta, alpha, excess return)
    Capm,
    /// Risk and return of a weighted portfolio, with CAPM and a bond comparison
    Portfolio,
    /// Enumerate the Nash equilibria of a two-player game
    Nash {
        #[arg(long, value_enum)]
        selection: Option<SelectionArg>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Yahoo,
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChartsArg {
    Svg,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SelectionArg {
    All,
    Last,
}

impl From<SourceArg> for DataSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Yahoo => DataSource::Yahoo,
            SourceArg::Csv => DataSource::Csv,
        }
    }
}

impl From<ChartsArg> for ChartRenderer {
    fn from(arg: ChartsArg) -> Self {
        match arg {
            ChartsArg::Svg => ChartRenderer::Svg,
            ChartsArg::None => ChartRenderer::None,
        }
    }
}

impl From<SelectionArg> for Selection {
    fn from(arg: SelectionArg) -> Self {
        match arg {
            SelectionArg::All => Selection::All,
            SelectionArg::Last => Selection::Last,
        }
    }
}

/// Runs one subcommand. Any error is printed to stdout and exits with 1.
pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            println!("\n{e}");
            (&e).into()
        }
    }
}

fn execute(cli: &Cli) -> Result<String, QuantError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Capm => {
            let capm = CapmConfig::from_config(&config)?;
            let (data, charts) = build_ports(cli, &config)?;
            Ok(run_capm_pipeline(data.as_ref(), charts.as_ref(), &capm)?.to_string())
        }
        Command::Portfolio => {
            let portfolio = PortfolioConfig::from_config(&config)?;
            let (data, charts) = build_ports(cli, &config)?;
            Ok(run_portfolio_pipeline(data.as_ref(), charts.as_ref(), &portfolio)?.to_string())
        }
        Command::Nash { selection } => {
            let mut nash = NashConfig::from_config(&config)?;
            if let Some(selection) = selection {
                nash.selection = selection.into();
            }
            Ok(run_nash_pipeline(&nash)?.to_string())
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, QuantError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

/// Data and chart ports from config, with command-line overrides applied.
pub fn build_ports(
    cli: &Cli,
    config: &FileConfigAdapter,
) -> Result<(Box<dyn PriceDataPort>, Box<dyn ChartPort>), QuantError> {
    let mut data = DataConfig::from_config(config)?;
    if let Some(source) = cli.source {
        data.source = source.into();
    }
    if let Some(dir) = &cli.csv_dir {
        data.csv_dir = dir.clone();
    }

    let mut charts = ChartConfig::from_config(config)?;
    if let Some(renderer) = cli.charts {
        charts.renderer = renderer.into();
    }
    if let Some(dir) = &cli.chart_dir {
        charts.output_dir = dir.clone();
    }

    let data_port: Box<dyn PriceDataPort> = match data.source {
        DataSource::Yahoo => Box::new(YahooAdapter::new(RetryPolicy {
            max_retries: data.max_retries,
            base_delay: data.base_delay,
            request_spacing: data.request_spacing,
        })?),
        DataSource::Csv => Box::new(CsvAdapter::new(data.csv_dir)),
    };
    let chart_port: Box<dyn ChartPort> = match charts.renderer {
        ChartRenderer::Svg => Box::new(SvgChartAdapter::new(charts.output_dir)),
        ChartRenderer::None => Box::new(NullChartAdapter),
    };
    Ok((data_port, chart_port))
}

fn series<'a>(table: &'a PriceTable, ticker: &str) -> Result<&'a PriceSeries, QuantError> {
    table.get(ticker).ok_or_else(|| QuantError::DataFetch {
        ticker: ticker.to_string(),
        reason: "missing from fetched price table".into(),
    })
}

pub fn run_capm_pipeline(
    data_port: &dyn PriceDataPort,
    chart_port: &dyn ChartPort,
    config: &CapmConfig,
) -> Result<CapmReport, QuantError> {
    // Stage 1: fetch
    tracing::info!(
        stock = %config.stock,
        market = %config.market,
        start = %config.start_date,
        end = %config.end_date,
        "fetching prices"
    );
    let tickers = [config.stock.clone(), config.market.clone()];
    let table = data_port.fetch_table(&tickers, config.start_date, config.end_date)?;

    // Stage 2: returns on common dates
    let stock = to_returns(series(&table, &config.stock)?, config.frequency)?;
    let market = to_returns(series(&table, &config.market)?, config.frequency)?;
    let matrix = align_returns(&[market, stock])?;
    let (x, y) = (matrix.column(0), matrix.column(1));
    tracing::info!(observations = matrix.n_obs(), frequency = %config.frequency, "aligned returns");

    // Stage 3: regression
    let regression = linregress(&x, &y)?;

    // Stage 4: chart
    let mut chart = ScatterChart::new(
        format!("{} vs {} {} returns", config.stock, config.market, config.frequency),
        format!("{} return", config.market),
        format!("{} return", config.stock),
    )
    .with_points(&x, &y);
    chart.fit_line = Some((regression.slope, regression.intercept));
    chart.origin_axes = true;
    chart_port.scatter(&chart)?;

    Ok(CapmReport::new(
        &config.stock,
        &config.market,
        config.frequency,
        regression,
        config.annual_tbill_rate,
    ))
}

fn portfolio_series(dates: &[chrono::NaiveDate], values: Vec<f64>) -> ReturnSeries {
    ReturnSeries {
        ticker: PORTFOLIO_LABEL.to_string(),
        points: dates
            .iter()
            .zip(values)
            .map(|(&date, value)| ReturnPoint { date, value })
            .collect(),
    }
}

pub fn run_portfolio_pipeline(
    data_port: &dyn PriceDataPort,
    chart_port: &dyn ChartPort,
    config: &PortfolioConfig,
) -> Result<PortfolioReport, QuantError> {
    // Stage 1: fetch assets, market and bond proxy
    let mut tickers = config.tickers.clone();
    for extra in [&config.market, &config.bond] {
        if !tickers.contains(extra) {
            tickers.push(extra.clone());
        }
    }
    tracing::info!(tickers = ?tickers, start = %config.start_date, end = %config.end_date, "fetching prices");
    let table = data_port.fetch_table(&tickers, config.start_date, config.end_date)?;

    // Stage 2: normalized prices
    let normalized = config
        .tickers
        .iter()
        .map(|t| -> Result<LineSeries, QuantError> {
            Ok(LineSeries {
                name: t.clone(),
                points: series(&table, t)?.normalize(100.0)?,
            })
        })
        .collect::<Result<Vec<_>, QuantError>>()?;
    chart_port.line(&LineChart {
        title: "Normalized prices".into(),
        y_label: "Price (base 100)".into(),
        series: normalized,
    })?;

    // Stage 3: daily returns
    let asset_returns = config
        .tickers
        .iter()
        .map(|t| to_returns(series(&table, t)?, Frequency::Daily))
        .collect::<Result<Vec<_>, QuantError>>()?;
    let matrix = align_returns(&asset_returns)?;
    chart_port.line(&LineChart {
        title: "Daily returns".into(),
        y_label: "Return".into(),
        series: asset_returns
            .iter()
            .map(|r| LineSeries {
                name: format!("{} Return", r.ticker),
                points: r.points.iter().map(|p| (p.date, p.value)).collect(),
            })
            .collect(),
    })?;

    // Stage 4: risk and return
    let analysis = PortfolioAnalysis::compute(&matrix, &config.weights, config.trading_days)?;
    chart_port.bar(&BarChart {
        title: "Annual returns".into(),
        y_label: "Annualized mean return".into(),
        bars: analysis
            .tickers
            .iter()
            .cloned()
            .zip(analysis.annual_returns.iter().copied())
            .collect(),
    })?;
    tracing::info!(
        expected_return = analysis.expected_return,
        volatility = analysis.volatility,
        "portfolio analysed"
    );

    // Stage 5: CAPM against the market
    let portfolio = portfolio_series(&matrix.dates, portfolio_returns(&matrix, &config.weights)?);
    let market = to_returns(series(&table, &config.market)?, Frequency::Daily)?;
    let with_market = align_returns(&[portfolio.clone(), market])?;
    let beta = capm_beta(&with_market.column(0), &with_market.column(1), config.trading_days)?;
    let expected =
        capm_expected_return(beta, config.risk_free_rate, config.market_risk_premium);

    // Stage 6: bond comparison
    let bond = to_returns(series(&table, &config.bond)?, Frequency::Daily)?;
    let with_bond = align_returns(&[portfolio, bond])?;
    let (port_daily, bond_daily) = (with_bond.column(0), with_bond.column(1));
    chart_port.scatter(
        &ScatterChart::new(
            format!("Return/Risk for {} vs {}", PORTFOLIO_LABEL, config.bond),
            "Expected Return",
            "Risk",
        )
        .with_labelled_point(&config.bond, mean(&bond_daily), sample_std_dev(&bond_daily))
        .with_labelled_point(PORTFOLIO_LABEL, mean(&port_daily), sample_std_dev(&port_daily)),
    )?;
    let comparison = vec![
        ComparativeStats::compute(PORTFOLIO_LABEL, &port_daily, config.trading_days),
        ComparativeStats::compute(&config.bond, &bond_daily, config.trading_days),
    ];

    Ok(PortfolioReport {
        analysis,
        market: config.market.clone(),
        beta,
        risk_free_rate: config.risk_free_rate,
        market_risk_premium: config.market_risk_premium,
        capm_expected_return: expected,
        comparison,
    })
}

pub fn run_nash_pipeline(config: &NashConfig) -> Result<NashReport, QuantError> {
    let game = Game::from_rows(&config.row_payoffs, &config.col_payoffs)?;
    let zero_sum = game.is_zero_sum();
    tracing::info!(shape = ?game.shape(), zero_sum, "enumerating supports");

    let all = game.support_enumeration();
    if all.is_empty() {
        return Err(QuantError::Solver {
            reason: "support enumeration found no equilibrium (degenerate game)".into(),
        });
    }
    let found = all.len();

    let equilibria = config
        .selection
        .apply(all)
        .into_iter()
        .map(|eq| {
            let payoffs = game.expected_payoffs(&eq);
            (eq, payoffs)
        })
        .collect();

    Ok(NashReport {
        shape: game.shape(),
        zero_sum,
        selection: config.selection,
        equilibria,
        found,
    })
}
