//! DAG and DAG-run operations.

use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::error::Result;
use crate::http::Verb;

impl Client {
    /// Trigger a new run of `dag_id`.
    ///
    /// `body` is sent as JSON; see [`DagRunRequest`](crate::DagRunRequest)
    /// for the fields the service accepts.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use airflow_client::{Client, ClientConfig, DagRunRequest};
    /// # use serde_json::json;
    /// # async fn example() -> Result<(), airflow_client::ClientError> {
    /// # let client = Client::new(ClientConfig::new("http://localhost:8080"))?;
    /// let run = client
    ///     .create_dag_run("example_bash_operator", &DagRunRequest::with_conf(json!({})))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_dag_run<T: Serialize + ?Sized>(
        &self,
        dag_id: &str,
        body: &T,
    ) -> Result<Option<Value>> {
        self.send_json(Verb::Post, &format!("dags/{dag_id}/dag_runs"), body)
            .await
    }

    /// List the runs of `dag_id`.
    pub async fn get_dag_runs(&self, dag_id: &str) -> Result<Option<Value>> {
        self.dispatch(Verb::Get, &format!("dags/{dag_id}/dag_runs"), None, None)
            .await
    }

    /// Fetch the run of `dag_id` at `execution_date`.
    pub async fn get_dag_run(&self, dag_id: &str, execution_date: &str) -> Result<Option<Value>> {
        let path = format!("dags/{dag_id}/dag_runs/{execution_date}");
        self.dispatch(Verb::Get, &path, None, None).await
    }

    /// Pause or unpause `dag_id`.
    ///
    /// The service takes this as a GET with the flag in the path
    /// (`dags/{id}/paused/true`), not as a body.
    pub async fn pause_dag(&self, dag_id: &str, paused: bool) -> Result<Option<Value>> {
        let path = format!("dags/{dag_id}/paused/{paused}");
        self.dispatch(Verb::Get, &path, None, None).await
    }

    /// Latest run of every DAG.
    pub async fn latest_dag_runs(&self) -> Result<Option<Value>> {
        self.dispatch(Verb::Get, "latest_runs", None, None).await
    }
}
