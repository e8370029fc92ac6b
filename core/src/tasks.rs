//! Task and task-instance lookups.

use serde_json::Value;

use crate::client::Client;
use crate::error::Result;
use crate::http::Verb;

impl Client {
    /// Describe task `task_id` of `dag_id`.
    pub async fn get_task(&self, dag_id: &str, task_id: &str) -> Result<Option<Value>> {
        let path = format!("dags/{dag_id}/tasks/{task_id}");
        self.dispatch(Verb::Get, &path, None, None).await
    }

    /// State of `task_id` within the run of `dag_id` at `execution_date`.
    pub async fn get_task_instance(
        &self,
        dag_id: &str,
        task_id: &str,
        execution_date: &str,
    ) -> Result<Option<Value>> {
        let path = format!("dags/{dag_id}/dag_runs/{execution_date}/tasks/{task_id}");
        self.dispatch(Verb::Get, &path, None, None).await
    }
}
