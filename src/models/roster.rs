use std::collections::HashMap;

use crate::models::agent::{Agent, AgentId};

/// エージェント管理表
///
/// 生成順にエージェントを保持し、IDから参照できるようにします。
/// 終了したエージェントも記録として残ります。
#[derive(Debug, Default)]
pub struct Roster {
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
    next_id: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しいIDを払い出す
    pub fn allocate_id(&mut self) -> AgentId {
        self.next_id += 1;
        AgentId(self.next_id)
    }

    /// エージェントを追加
    ///
    /// 同じIDのエージェントが既にある場合は置き換えます。
    pub fn insert(&mut self, agent: Agent) -> AgentId {
        let id = agent.id();
        if id.0 > self.next_id {
            self.next_id = id.0;
        }
        match self.index.get(&id) {
            Some(&slot) => self.agents[slot] = agent,
            None => {
                self.index.insert(id, self.agents.len());
                self.agents.push(agent);
            }
        }
        id
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&slot| &self.agents[slot])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        match self.index.get(&id) {
            Some(&slot) => self.agents.get_mut(slot),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// 全エージェントIDのコピー（走査中の追加・変更に影響されない）
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(Agent::id).collect()
    }

    pub fn interceptors(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|agent| agent.is_interceptor())
    }

    pub fn threats(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|agent| agent.is_threat())
    }

    /// 終了していない迎撃体
    pub fn active_interceptors(&self) -> Vec<&Agent> {
        self.interceptors().filter(|agent| agent.core.is_active()).collect()
    }

    /// 終了していない脅威
    pub fn active_threats(&self) -> Vec<&Agent> {
        self.threats().filter(|agent| agent.core.is_active()).collect()
    }

    pub fn clear(&mut self) {
        self.agents.clear();
        self.index.clear();
        self.next_id = 0;
    }
}
