use std::path::Path;
use std::str::FromStr;

use clap::{Arg, Command};
use swarmsim::logging::{self, LogConfig, LogOutput};
use swarmsim::scenario::{AssignmentPolicyKind, ScenarioConfig};
use swarmsim::simulation::{RunSummary, SimulationEngine};

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("swarmsim")
        .version("0.1.0")
        .about("群対群交戦シミュレーション (Swarm Engagement Simulation)")
        .long_about("迎撃体の群と脅威の群の交戦を固定時間刻みでシミュレーションします。\n\
                     比例航法による誘導と脅威レジストリによる目標割り当てを評価します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .conflicts_with("demo")
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みのデモシナリオを実行")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .value_name("POLICY")
                .help("割り当てポリシーを上書き (round_robin, threat_level)")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: トレース)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ")
        )
        .get_matches();

    let verbose_level = matches.get_count("verbose");

    let output = match matches.get_one::<String>("log-output").map(|s| LogOutput::from_str(s)) {
        Some(Ok(output)) => output,
        Some(Err(e)) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
        None => LogOutput::Console,
    };
    let level = matches
        .get_one::<String>("log-level")
        .map_or_else(|| logging::level_for_verbosity(verbose_level), |s| logging::parse_log_level(s));
    let log_config = LogConfig {
        level,
        output,
        log_dir: matches.get_one::<String>("log-dir").cloned().unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    };
    let _guard = match logging::init_logging(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("エラー: ログを初期化できません: {}", e);
            std::process::exit(1);
        }
    };

    println!("群対群交戦シミュレーション - swarmsim v0.1.0");
    println!();

    let policy = match matches.get_one::<String>("policy").map(|s| AssignmentPolicyKind::from_str(s)) {
        Some(Ok(policy)) => Some(policy),
        Some(Err(e)) => {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
        None => None,
    };

    let scenario = if matches.get_flag("demo") {
        Ok(ScenarioConfig::demo())
    } else if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        if verbose_level > 0 {
            println!("シナリオファイル読み込み: {}", scenario_path);
        }
        ScenarioConfig::from_file(scenario_path)
    } else {
        show_default_help();
        return;
    };

    let result = scenario
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|mut scenario| {
            if let Some(policy) = policy {
                scenario.defense.assignment_policy = policy;
            }
            run_scenario(scenario, matches.get_flag("info"), verbose_level)
        });

    if let Err(e) = result {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// シナリオの実行
fn run_scenario(scenario: ScenarioConfig, info_only: bool, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    scenario.print_summary();
    println!();

    // 情報表示のみの場合
    if info_only {
        return Ok(());
    }

    let mut simulation = SimulationEngine::new(scenario, verbose_level);
    simulation.initialize()?;
    let summary = simulation.run()?;
    print_run_summary(&summary);

    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    let tally = &summary.tally;
    println!();
    println!("=== 交戦結果 ===");
    println!("終了理由: {:?}", summary.stop_reason);
    println!("経過時間: {:.2}秒 ({}ステップ)", summary.elapsed_time, summary.steps);
    println!("迎撃体: {}発 (子弾を含む)", summary.interceptors_total);
    println!("脅威: {}機 (残存: {}機)", summary.threats_total, summary.threats_remaining);
    println!();
    println!("命中: {}", tally.hits);
    println!("ミス: {} (撃破判定失敗: {}, 射程外: {}, 地表到達: {})",
        tally.misses, tally.kill_roll_failures, tally.out_of_range, tally.ground_impacts);
    println!("撃破した脅威: {}", tally.threats_destroyed());
    println!("到達した脅威: {}", tally.threats_leaked);
    println!("命中率: {:.1}%", tally.hit_ratio() * 100.0);
    if let (Some(first), Some(last)) = (tally.first_hit_time, tally.last_hit_time) {
        println!("初弾命中: {:.2}秒, 最終命中: {:.2}秒", first, last);
    }
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  swarmsim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>     シナリオファイルを指定して実行");
    println!("      --demo                組み込みデモシナリオを実行");
    println!("  -i, --info                シナリオ情報のみ表示");
    println!("      --policy <POLICY>     割り当てポリシー (round_robin, threat_level)");
    println!("  -v, --verbose             詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-output <OUTPUT> ログ出力先 (console, file, both)");
    println!("      --log-level <LEVEL>   ログレベル");
    println!("      --log-dir <DIR>       ログディレクトリ");
    println!("  -h, --help                このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    for path in bundled_scenarios() {
        println!("  {}", path);
    }
    println!();
    println!("例:");
    println!("  swarmsim --demo");
    println!("  swarmsim -s scenarios/1_salvo_1_hydra_7_drones.yaml -v");
    println!("  swarmsim -s scenarios/7_micromissiles_7_drones.yaml --policy round_robin");
    println!("  swarmsim -s scenarios/3_micromissiles_3_antiship_round_robin.yaml -i");
}

/// scenarios/ 以下の YAML ファイル一覧
fn bundled_scenarios() -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(Path::new("scenarios")) else {
        return Vec::new();
    };
    let mut paths: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
        .map(|path| path.display().to_string())
        .collect();
    paths.sort();
    paths
}
