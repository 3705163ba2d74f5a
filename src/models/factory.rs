use std::collections::BTreeMap;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::debug;

use crate::models::{
    agent::{Agent, AgentCore, AgentId, AgentKind},
    common::{BodyFrame, KinematicState, Vector3, constants},
    interceptor::{DEFAULT_NAVIGATION_GAIN, Interceptor},
    sensor::SensorModel,
    threat::{NavigationStrategy, Threat, ThreatVariant},
};
use crate::scenario::{AgentConfig, InterceptorType, StaticConfig};

/// エージェント生成エラー
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FactoryError {
    #[error("静的モデルが見つかりません: {0}")]
    MissingStaticModel(String),
    #[error("サポートされていないエージェント種別です: {0}")]
    UnsupportedAgentType(String),
    #[error("ノイズ設定が不正です: {0}")]
    InvalidNoise(String),
}

/// エージェント生成器
///
/// 設定から位置・速度・姿勢・センサーを備えたエージェントを生成します。
/// 名前は `{種別}_Interceptor_{n}` / `{種別}_Target_{n}`。
#[derive(Debug, Clone)]
pub struct AgentFactory {
    static_models: BTreeMap<String, StaticConfig>,
    interceptor_count: u32,
    threat_count: u32,
}

impl AgentFactory {
    pub fn new(static_models: BTreeMap<String, StaticConfig>) -> Self {
        Self {
            static_models,
            interceptor_count: 0,
            threat_count: 0,
        }
    }

    /// 迎撃体の生成
    ///
    /// # 引数
    ///
    /// * `id` - 割り当て済みのエージェントID
    /// * `config` - 生成設定（`interceptor_type` 必須）
    /// * `rng` - ノイズ用乱数生成器
    ///
    /// # 戻り値
    ///
    /// READY 前（INITIALIZED）のエージェント
    pub fn create_interceptor<R: Rng + ?Sized>(
        &mut self,
        id: AgentId,
        config: &AgentConfig,
        rng: &mut R,
    ) -> Result<Agent, FactoryError> {
        let state = initial_kinematics(config, rng)?;
        self.build_interceptor(id, config, state)
    }

    /// 子弾の生成
    ///
    /// 母機の現在位置・速度を初期状態とし、設定のノイズを加えます。
    pub fn create_submunition<R: Rng + ?Sized>(
        &mut self,
        id: AgentId,
        config: &AgentConfig,
        carrier: &KinematicState,
        rng: &mut R,
    ) -> Result<Agent, FactoryError> {
        let position = carrier.position + sample_noise(rng, config.standard_deviation.position)?;
        let velocity = carrier.velocity + sample_noise(rng, config.standard_deviation.velocity)?;
        let frame = carrier.frame.aligned_with(velocity, constants::ALIGN_MIN_SPEED);
        self.build_interceptor(id, config, KinematicState::new(position, velocity, frame))
    }

    /// 脅威の生成
    pub fn create_threat<R: Rng + ?Sized>(
        &mut self,
        id: AgentId,
        config: &AgentConfig,
        rng: &mut R,
    ) -> Result<Agent, FactoryError> {
        let threat_type = config
            .threat_type
            .ok_or_else(|| FactoryError::UnsupportedAgentType("threat_type is not set".to_string()))?;
        let static_name = config
            .static_model
            .clone()
            .unwrap_or_else(|| threat_type.default_static_model().to_string());
        let static_config = self.resolve_static(&static_name)?;
        let state = initial_kinematics(config, rng)?;

        self.threat_count += 1;
        let name = format!("{}_Target_{}", threat_type.display_name(), self.threat_count);

        let strategy = NavigationStrategy::from_kind(config.navigation_strategy.unwrap_or_default(), config.navigation_gain);
        let mut threat = Threat::new(ThreatVariant::from(threat_type), strategy);
        threat.sensor = SensorModel::from_type(config.dynamic_config.sensor_config.sensor_type);

        debug!(agent_id = %id, agent_name = %name, static_model = %static_name, "AGENT_CREATED: 脅威を生成しました");

        let core = AgentCore::new(id, name, state, static_config, config.dynamic_config);
        Ok(Agent::new(core, AgentKind::Threat(threat)))
    }

    fn build_interceptor(
        &mut self,
        id: AgentId,
        config: &AgentConfig,
        state: KinematicState,
    ) -> Result<Agent, FactoryError> {
        let interceptor_type = config
            .interceptor_type
            .ok_or_else(|| FactoryError::UnsupportedAgentType("interceptor_type is not set".to_string()))?;
        let static_name = config
            .static_model
            .clone()
            .unwrap_or_else(|| interceptor_type.default_static_model().to_string());
        let static_config = self.resolve_static(&static_name)?;

        self.interceptor_count += 1;
        let name = format!("{}_Interceptor_{}", interceptor_type.display_name(), self.interceptor_count);

        let sensor = SensorModel::from_type(config.dynamic_config.sensor_config.sensor_type);
        let interceptor = match interceptor_type {
            InterceptorType::Hydra70 => Interceptor::hydra70(config.submunitions_config.clone()),
            InterceptorType::Micromissile => {
                Interceptor::micromissile(config.navigation_gain.unwrap_or(DEFAULT_NAVIGATION_GAIN))
            }
        }
        .with_sensor(sensor);

        debug!(agent_id = %id, agent_name = %name, static_model = %static_name, "AGENT_CREATED: 迎撃体を生成しました");

        let core = AgentCore::new(id, name, state, static_config, config.dynamic_config);
        Ok(Agent::new(core, AgentKind::Interceptor(interceptor)))
    }

    fn resolve_static(&self, name: &str) -> Result<StaticConfig, FactoryError> {
        self.static_models
            .get(name)
            .copied()
            .ok_or_else(|| FactoryError::MissingStaticModel(name.to_string()))
    }
}

/// 設定の初期状態にノイズを加えた運動状態
fn initial_kinematics<R: Rng + ?Sized>(config: &AgentConfig, rng: &mut R) -> Result<KinematicState, FactoryError> {
    let initial = &config.initial_state;
    let position = initial.position + sample_noise(rng, config.standard_deviation.position)?;
    let velocity = initial.velocity + sample_noise(rng, config.standard_deviation.velocity)?;
    let frame = BodyFrame::from_euler_degrees(initial.rotation);
    Ok(KinematicState::new(position, velocity, frame))
}

/// 各軸独立の正規分布ノイズ
///
/// 標準偏差が0の軸は乱数を消費しません。
pub fn sample_noise<R: Rng + ?Sized>(rng: &mut R, std_dev: Vector3) -> Result<Vector3, FactoryError> {
    let mut axis = |sigma: f64| -> Result<f64, FactoryError> {
        if sigma < 0.0 || !sigma.is_finite() {
            return Err(FactoryError::InvalidNoise(format!("sigma={}", sigma)));
        }
        if sigma == 0.0 {
            return Ok(0.0);
        }
        let normal = Normal::new(0.0, sigma).map_err(|e| FactoryError::InvalidNoise(format!("sigma={}: {}", sigma, e)))?;
        Ok(normal.sample(&mut *rng))
    };
    Ok(Vector3::new(axis(std_dev.x)?, axis(std_dev.y)?, axis(std_dev.z)?))
}
