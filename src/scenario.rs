use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::models::common::{Vector3, constants};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
    pub seed: u64,
    /// 最大ステップ数（省略時は t_max_s のみで終了）
    #[serde(default)]
    pub max_steps: Option<u64>,
}

/// 割り当てポリシーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicyKind {
    RoundRobin,
    #[default]
    ThreatLevel,
}

impl FromStr for AssignmentPolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Ok(AssignmentPolicyKind::RoundRobin),
            "threat_level" | "threatlevel" => Ok(AssignmentPolicyKind::ThreatLevel),
            _ => Err(format!("Invalid assignment policy: {}. Valid options: round_robin, threat_level", s)),
        }
    }
}

/// 防空設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// 防護対象地点（脅威度の基準点）
    pub defended_point: Vector3,
    pub assignment_policy: AssignmentPolicyKind,
    /// 追尾中にこの距離を超えたらミス（m）
    pub miss_range_m: f64,
    /// 静的モデルに命中半径がない場合の既定値（m）
    pub hit_radius_m: f64,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            defended_point: Vector3::ZERO,
            assignment_policy: AssignmentPolicyKind::default(),
            miss_range_m: constants::MISS_RANGE_THRESHOLD,
            hit_radius_m: 1.0,
        }
    }
}

/// 加速度設定
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AccelerationConfig {
    /// 基準速度での最大加速度（G）
    pub max_reference_acceleration: f64,
    /// 基準速度（m/s）
    pub reference_speed: f64,
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        Self {
            max_reference_acceleration: 300.0,
            reference_speed: 1000.0,
        }
    }
}

/// ブースト設定
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BoostConfig {
    /// ブースト時間（s）
    pub boost_time: f64,
    /// ブースト加速度（G）
    pub boost_acceleration: f64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            boost_time: 0.3,
            boost_acceleration: 350.0,
        }
    }
}

/// 揚力・抗力設定
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LiftDragConfig {
    pub lift_coefficient: f64,
    pub drag_coefficient: f64,
    pub lift_drag_ratio: f64,
}

impl Default for LiftDragConfig {
    fn default() -> Self {
        Self {
            lift_coefficient: 0.2,
            drag_coefficient: 0.7,
            lift_drag_ratio: 5.0,
        }
    }
}

/// 機体設定
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// 質量（kg）
    pub mass: f64,
    /// 断面積（m²）
    pub cross_sectional_area: f64,
    pub fin_area: f64,
    pub body_area: f64,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            mass: 0.37,
            cross_sectional_area: 3e-4,
            fin_area: 6e-4,
            body_area: 1e-2,
        }
    }
}

/// 命中判定設定
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HitConfig {
    /// 命中半径（m）
    pub hit_radius: f64,
    /// 撃破確率 [0, 1]
    pub kill_probability: f64,
}

impl Default for HitConfig {
    fn default() -> Self {
        Self {
            hit_radius: 1.0,
            kill_probability: 0.9,
        }
    }
}

/// 機種ごとの静的性能
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    pub acceleration_config: AccelerationConfig,
    pub boost_config: BoostConfig,
    pub lift_drag_config: LiftDragConfig,
    pub body_config: BodyConfig,
    pub hit_config: HitConfig,
}

impl StaticConfig {
    /// 組み込みの静的モデル
    ///
    /// 名前は `hydra70` / `micromissile` / `drone` / `antiship_missile`。
    pub fn presets() -> BTreeMap<String, StaticConfig> {
        let mut presets = BTreeMap::new();
        presets.insert(InterceptorType::Micromissile.default_static_model().to_string(), StaticConfig::default());
        presets.insert(
            InterceptorType::Hydra70.default_static_model().to_string(),
            StaticConfig {
                acceleration_config: AccelerationConfig {
                    max_reference_acceleration: 10.0,
                    reference_speed: 700.0,
                },
                boost_config: BoostConfig {
                    boost_time: 1.1,
                    boost_acceleration: 65.0,
                },
                lift_drag_config: LiftDragConfig {
                    lift_coefficient: 0.2,
                    drag_coefficient: 0.3,
                    lift_drag_ratio: 5.0,
                },
                body_config: BodyConfig {
                    mass: 15.7,
                    cross_sectional_area: 3.8e-3,
                    fin_area: 6e-3,
                    body_area: 0.1,
                },
                hit_config: HitConfig {
                    hit_radius: 1.0,
                    kill_probability: 0.0,
                },
            },
        );
        presets.insert(
            ThreatType::Drone.default_static_model().to_string(),
            StaticConfig {
                acceleration_config: AccelerationConfig {
                    max_reference_acceleration: 4.0,
                    reference_speed: 50.0,
                },
                boost_config: BoostConfig {
                    boost_time: 0.0,
                    boost_acceleration: 0.0,
                },
                lift_drag_config: LiftDragConfig {
                    lift_coefficient: 0.5,
                    drag_coefficient: 0.1,
                    lift_drag_ratio: 5.0,
                },
                body_config: BodyConfig {
                    mass: 25.0,
                    cross_sectional_area: 0.2,
                    fin_area: 0.5,
                    body_area: 1.0,
                },
                hit_config: HitConfig {
                    hit_radius: 1.0,
                    kill_probability: 0.0,
                },
            },
        );
        presets.insert(
            ThreatType::AntishipMissile.default_static_model().to_string(),
            StaticConfig {
                acceleration_config: AccelerationConfig {
                    max_reference_acceleration: 15.0,
                    reference_speed: 300.0,
                },
                boost_config: BoostConfig {
                    boost_time: 2.0,
                    boost_acceleration: 10.0,
                },
                lift_drag_config: LiftDragConfig {
                    lift_coefficient: 0.3,
                    drag_coefficient: 0.3,
                    lift_drag_ratio: 5.0,
                },
                body_config: BodyConfig {
                    mass: 300.0,
                    cross_sectional_area: 0.1,
                    fin_area: 0.3,
                    body_area: 2.0,
                },
                hit_config: HitConfig {
                    hit_radius: 2.0,
                    kill_probability: 0.0,
                },
            },
        );
        presets
    }

    fn validate(&self, name: &str) -> Result<(), ScenarioError> {
        let hit = &self.hit_config;
        if !(0.0..=1.0).contains(&hit.kill_probability) {
            return Err(ScenarioError::ValidationError(format!(
                "static model {}: kill_probability {} must be within [0, 1]",
                name, hit.kill_probability
            )));
        }
        if self.body_config.mass <= 0.0 {
            return Err(ScenarioError::ValidationError(format!("static model {}: mass must be positive", name)));
        }
        if self.acceleration_config.reference_speed <= 0.0 {
            return Err(ScenarioError::ValidationError(format!(
                "static model {}: reference_speed must be positive",
                name
            )));
        }
        if self.lift_drag_config.lift_drag_ratio <= 0.0 {
            return Err(ScenarioError::ValidationError(format!(
                "static model {}: lift_drag_ratio must be positive",
                name
            )));
        }
        if hit.hit_radius < 0.0 || self.boost_config.boost_time < 0.0 {
            return Err(ScenarioError::ValidationError(format!(
                "static model {}: hit_radius and boost_time must not be negative",
                name
            )));
        }
        Ok(())
    }
}

/// 迎撃体の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptorType {
    Hydra70,
    Micromissile,
}

impl InterceptorType {
    pub fn default_static_model(&self) -> &'static str {
        match self {
            InterceptorType::Hydra70 => "hydra70",
            InterceptorType::Micromissile => "micromissile",
        }
    }

    /// エージェント名の接頭辞
    pub fn display_name(&self) -> &'static str {
        match self {
            InterceptorType::Hydra70 => "Hydra70",
            InterceptorType::Micromissile => "Micromissile",
        }
    }
}

/// 脅威の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    Drone,
    AntishipMissile,
}

impl ThreatType {
    pub fn default_static_model(&self) -> &'static str {
        match self {
            ThreatType::Drone => "drone",
            ThreatType::AntishipMissile => "antiship_missile",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThreatType::Drone => "Drone",
            ThreatType::AntishipMissile => "AntishipMissile",
        }
    }
}

/// 脅威の中間飛翔航法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationStrategyKind {
    Ballistic,
    #[default]
    DirectPath,
}

/// センサーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    #[default]
    Ideal,
}

/// 初期状態
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InitialState {
    pub position: Vector3,
    /// オイラー角（度）: x=ピッチ、y=ヨー、z=ロール
    pub rotation: Vector3,
    pub velocity: Vector3,
}

/// 生成時に加える正規分布ノイズの標準偏差
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StandardDeviation {
    pub position: Vector3,
    pub velocity: Vector3,
}

/// 発射設定
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// 発射時刻（s、エージェント開始からの経過時間）
    pub launch_time: f64,
}

/// センサー設定
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorConfig {
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
    /// 観測周波数（Hz）
    pub frequency: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sensor_type: SensorType::Ideal,
            frequency: 100.0,
        }
    }
}

/// 個体ごとの動的設定
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DynamicConfig {
    pub launch_config: LaunchConfig,
    pub sensor_config: SensorConfig,
}

/// 子弾設定
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubmunitionsConfig {
    pub num_submunitions: u32,
    #[serde(default)]
    pub launch_config: LaunchConfig,
    pub agent_config: AgentConfig,
}

/// エージェント生成設定
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub interceptor_type: Option<InterceptorType>,
    pub threat_type: Option<ThreatType>,
    /// 静的モデル名（省略時は種類ごとの既定モデル）
    pub static_model: Option<String>,
    pub initial_state: InitialState,
    pub standard_deviation: StandardDeviation,
    pub dynamic_config: DynamicConfig,
    pub submunitions_config: Option<Box<SubmunitionsConfig>>,
    pub navigation_gain: Option<f64>,
    pub navigation_strategy: Option<NavigationStrategyKind>,
}

impl AgentConfig {
    fn validate(&self, label: &str) -> Result<(), ScenarioError> {
        let sd = &self.standard_deviation;
        let components = [
            sd.position.x, sd.position.y, sd.position.z,
            sd.velocity.x, sd.velocity.y, sd.velocity.z,
        ];
        if components.iter().any(|&value| value < 0.0 || !value.is_finite()) {
            return Err(ScenarioError::ValidationError(format!(
                "{}: standard_deviation must be non-negative",
                label
            )));
        }
        if self.dynamic_config.sensor_config.frequency < 0.0 {
            return Err(ScenarioError::ValidationError(format!(
                "{}: sensor frequency must not be negative",
                label
            )));
        }
        if let Some(gain) = self.navigation_gain {
            if gain <= 0.0 {
                return Err(ScenarioError::ValidationError(format!(
                    "{}: navigation_gain must be positive",
                    label
                )));
            }
        }
        if let Some(submunitions) = &self.submunitions_config {
            if submunitions.agent_config.interceptor_type.is_none() {
                return Err(ScenarioError::ValidationError(format!(
                    "{}: submunition agent_config must be an interceptor config",
                    label
                )));
            }
            submunitions.agent_config.validate(&format!("{} submunitions", label))?;
        }
        Ok(())
    }
}

/// 同一設定のエージェント群
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwarmConfig {
    pub num_agents: u32,
    pub agent_config: AgentConfig,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    #[serde(default)]
    pub defense: DefenseConfig,
    /// 組み込みモデルを上書き・追加する静的モデル
    #[serde(default)]
    pub static_models: BTreeMap<String, StaticConfig>,
    #[serde(default)]
    pub interceptor_swarms: Vec<SwarmConfig>,
    #[serde(default)]
    pub threat_swarms: Vec<SwarmConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig =
            serde_yaml::from_str(&contents).map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig =
            serde_yaml::from_str(contents).map_err(|e| ScenarioError::ParseError(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError("dt_s must be positive".to_string()));
        }
        if self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::ValidationError("t_max_s must be positive".to_string()));
        }
        if self.defense.miss_range_m <= 0.0 {
            return Err(ScenarioError::ValidationError("miss_range_m must be positive".to_string()));
        }
        if self.defense.hit_radius_m < 0.0 {
            return Err(ScenarioError::ValidationError("hit_radius_m must not be negative".to_string()));
        }

        for (name, model) in &self.static_models {
            model.validate(name)?;
        }

        for (index, swarm) in self.interceptor_swarms.iter().enumerate() {
            let label = format!("interceptor_swarms[{}]", index);
            if swarm.agent_config.interceptor_type.is_none() {
                return Err(ScenarioError::ValidationError(format!("{}: interceptor_type is required", label)));
            }
            swarm.agent_config.validate(&label)?;
        }
        for (index, swarm) in self.threat_swarms.iter().enumerate() {
            let label = format!("threat_swarms[{}]", index);
            if swarm.agent_config.threat_type.is_none() {
                return Err(ScenarioError::ValidationError(format!("{}: threat_type is required", label)));
            }
            swarm.agent_config.validate(&label)?;
        }

        Ok(())
    }

    /// 組み込みモデルにシナリオ定義を重ねた静的モデル表
    pub fn resolved_static_models(&self) -> BTreeMap<String, StaticConfig> {
        let mut models = StaticConfig::presets();
        for (name, model) in &self.static_models {
            models.insert(name.clone(), *model);
        }
        models
    }

    /// 迎撃体の総数（子弾を含む）
    pub fn total_interceptors(&self) -> u64 {
        self.interceptor_swarms
            .iter()
            .map(|swarm| {
                let children = swarm
                    .agent_config
                    .submunitions_config
                    .as_ref()
                    .map_or(0, |sub| u64::from(sub.num_submunitions));
                u64::from(swarm.num_agents) * (1 + children)
            })
            .sum()
    }

    pub fn total_threats(&self) -> u64 {
        self.threat_swarms.iter().map(|swarm| u64::from(swarm.num_agents)).sum()
    }

    /// 組み込みデモシナリオ
    ///
    /// Hydra-70 1発が7発のマイクロミサイルを放出し、接近する7機のドローンを迎撃します。
    pub fn demo() -> Self {
        let micromissile = AgentConfig {
            interceptor_type: Some(InterceptorType::Micromissile),
            standard_deviation: StandardDeviation {
                position: Vector3::new(2.0, 2.0, 2.0),
                velocity: Vector3::new(5.0, 5.0, 5.0),
            },
            dynamic_config: DynamicConfig {
                launch_config: LaunchConfig { launch_time: 0.0 },
                sensor_config: SensorConfig {
                    sensor_type: SensorType::Ideal,
                    frequency: 100.0,
                },
            },
            navigation_gain: Some(3.0),
            ..AgentConfig::default()
        };

        let hydra = AgentConfig {
            interceptor_type: Some(InterceptorType::Hydra70),
            initial_state: InitialState {
                position: Vector3::new(0.0, 1.0, 0.0),
                rotation: Vector3::new(-15.0, 0.0, 0.0),
                velocity: Vector3::ZERO,
            },
            dynamic_config: DynamicConfig {
                launch_config: LaunchConfig { launch_time: 0.0 },
                sensor_config: SensorConfig::default(),
            },
            submunitions_config: Some(Box::new(SubmunitionsConfig {
                num_submunitions: 7,
                launch_config: LaunchConfig { launch_time: 1.5 },
                agent_config: micromissile,
            })),
            ..AgentConfig::default()
        };

        let drone = AgentConfig {
            threat_type: Some(ThreatType::Drone),
            initial_state: InitialState {
                position: Vector3::new(0.0, 250.0, 1800.0),
                rotation: Vector3::new(0.0, 180.0, 0.0),
                velocity: Vector3::new(0.0, 0.0, -50.0),
            },
            standard_deviation: StandardDeviation {
                position: Vector3::new(60.0, 15.0, 60.0),
                velocity: Vector3::new(2.0, 0.0, 2.0),
            },
            navigation_strategy: Some(NavigationStrategyKind::DirectPath),
            ..AgentConfig::default()
        };

        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "demo_hydra_salvo_vs_drones".to_string(),
                description: "Hydra-70 1発（子弾7発）でドローン7機を迎撃".to_string(),
            },
            sim: SimulationConfig {
                dt_s: 0.01,
                t_max_s: 60.0,
                seed: 42,
                max_steps: None,
            },
            defense: DefenseConfig::default(),
            static_models: BTreeMap::new(),
            interceptor_swarms: vec![SwarmConfig { num_agents: 1, agent_config: hydra }],
            threat_swarms: vec![SwarmConfig { num_agents: 7, agent_config: drone }],
        }
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒 ({:.1}分)", self.sim.t_max_s, self.sim.t_max_s / 60.0);
        println!("シード値: {}", self.sim.seed);
        if let Some(max_steps) = self.sim.max_steps {
            println!("最大ステップ数: {}", max_steps);
        }
        println!();

        println!("=== 防空設定 ===");
        println!("防護地点: {}", self.defense.defended_point);
        println!("割り当てポリシー: {:?}", self.defense.assignment_policy);
        println!("ミス判定距離: {:.0}m", self.defense.miss_range_m);
        println!();

        println!("=== 迎撃戦力 ===");
        for swarm in &self.interceptor_swarms {
            let kind = swarm.agent_config.interceptor_type.map_or("?", |t| t.display_name());
            match &swarm.agent_config.submunitions_config {
                Some(sub) => println!("  {}: {}発 (子弾 {}発/発, 放出時刻: {:.1}秒)",
                    kind, swarm.num_agents, sub.num_submunitions, sub.launch_config.launch_time),
                None => println!("  {}: {}発", kind, swarm.num_agents),
            }
        }
        println!("総迎撃体数: {}発", self.total_interceptors());
        println!();

        println!("=== 脅威 ===");
        for swarm in &self.threat_swarms {
            let kind = swarm.agent_config.threat_type.map_or("?", |t| t.display_name());
            println!("  {}: {}機 (初期位置: {})", kind, swarm.num_agents, swarm.agent_config.initial_state.position);
        }
        println!("総脅威数: {}機", self.total_threats());
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALVO_SCENARIO: &str = include_str!("../scenarios/1_salvo_1_hydra_7_drones.yaml");
    const MICROMISSILE_SCENARIO: &str = include_str!("../scenarios/7_micromissiles_7_drones.yaml");
    const MIXED_SCENARIO: &str = include_str!("../scenarios/3_micromissiles_3_antiship_round_robin.yaml");

    #[test]
    fn test_bundled_salvo_scenario_parses() {
        let config = ScenarioConfig::from_yaml_str(SALVO_SCENARIO).unwrap();
        assert_eq!(config.interceptor_swarms.len(), 1);
        let hydra = &config.interceptor_swarms[0].agent_config;
        assert_eq!(hydra.interceptor_type, Some(InterceptorType::Hydra70));
        let sub = hydra.submunitions_config.as_ref().unwrap();
        assert_eq!(sub.num_submunitions, 7);
        assert_eq!(sub.agent_config.interceptor_type, Some(InterceptorType::Micromissile));
        assert_eq!(config.total_interceptors(), 8);
        assert_eq!(config.total_threats(), 7);
    }

    #[test]
    fn test_bundled_micromissile_scenario_parses() {
        let config = ScenarioConfig::from_yaml_str(MICROMISSILE_SCENARIO).unwrap();
        assert_eq!(config.defense.assignment_policy, AssignmentPolicyKind::ThreatLevel);
        assert_eq!(config.total_interceptors(), 7);
        assert_eq!(config.threat_swarms[0].agent_config.threat_type, Some(ThreatType::Drone));
    }

    #[test]
    fn test_bundled_round_robin_scenario_parses() {
        let config = ScenarioConfig::from_yaml_str(MIXED_SCENARIO).unwrap();
        assert_eq!(config.defense.assignment_policy, AssignmentPolicyKind::RoundRobin);
        assert_eq!(config.threat_swarms[0].agent_config.threat_type, Some(ThreatType::AntishipMissile));
        assert_eq!(config.sim.max_steps, Some(3000));
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
meta:
  version: "1.0"
  name: minimal
sim:
  dt_s: 0.02
  t_max_s: 10.0
  seed: 7
interceptor_swarms:
  - num_agents: 2
    agent_config:
      interceptor_type: micromissile
"#;
        let config = ScenarioConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.defense.miss_range_m, 1000.0);
        assert_eq!(config.defense.assignment_policy, AssignmentPolicyKind::ThreatLevel);
        let agent = &config.interceptor_swarms[0].agent_config;
        assert_eq!(agent.dynamic_config.sensor_config.frequency, 100.0);
        assert_eq!(agent.initial_state.position, Vector3::ZERO);
    }

    #[test]
    fn test_static_model_override_keeps_unspecified_defaults() {
        let yaml = r#"
meta: { version: "1.0", name: override }
sim: { dt_s: 0.02, t_max_s: 10.0, seed: 1 }
static_models:
  micromissile:
    hit_config:
      kill_probability: 1.0
"#;
        let config = ScenarioConfig::from_yaml_str(yaml).unwrap();
        let models = config.resolved_static_models();
        let micromissile = models["micromissile"];
        assert_eq!(micromissile.hit_config.kill_probability, 1.0);
        assert_eq!(micromissile.hit_config.hit_radius, 1.0);
        assert_eq!(micromissile.boost_config.boost_acceleration, 350.0);
        assert!(models.contains_key("hydra70"));
    }

    #[test]
    fn test_invalid_kill_probability_rejected() {
        let yaml = r#"
meta: { version: "1.0", name: bad }
sim: { dt_s: 0.02, t_max_s: 10.0, seed: 1 }
static_models:
  micromissile:
    hit_config:
      kill_probability: 1.5
"#;
        assert!(matches!(
            ScenarioConfig::from_yaml_str(yaml),
            Err(ScenarioError::ValidationError(_))
        ));
    }

    #[test]
    fn test_swarm_without_type_rejected() {
        let yaml = r#"
meta: { version: "1.0", name: bad }
sim: { dt_s: 0.02, t_max_s: 10.0, seed: 1 }
threat_swarms:
  - num_agents: 1
    agent_config:
      interceptor_type: micromissile
"#;
        assert!(matches!(
            ScenarioConfig::from_yaml_str(yaml),
            Err(ScenarioError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_enum_value_is_parse_error() {
        let yaml = r#"
meta: { version: "1.0", name: bad }
sim: { dt_s: 0.02, t_max_s: 10.0, seed: 1 }
interceptor_swarms:
  - num_agents: 1
    agent_config:
      interceptor_type: patriot
"#;
        assert!(matches!(
            ScenarioConfig::from_yaml_str(yaml),
            Err(ScenarioError::ParseError(_, _))
        ));
    }

    #[test]
    fn test_missing_file_reported() {
        let result = ScenarioConfig::from_file("/nonexistent/scenario.yaml");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_demo_scenario_is_valid() {
        let config = ScenarioConfig::demo();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_interceptors(), 8);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("round-robin".parse::<AssignmentPolicyKind>(), Ok(AssignmentPolicyKind::RoundRobin));
        assert_eq!("THREAT_LEVEL".parse::<AssignmentPolicyKind>(), Ok(AssignmentPolicyKind::ThreatLevel));
        assert!("nearest".parse::<AssignmentPolicyKind>().is_err());
    }
}
