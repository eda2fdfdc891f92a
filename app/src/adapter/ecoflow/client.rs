use infrastructure::HttpClient;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::time::DateTime;
use crate::core::unit::{DegreeCelsius, Percent, Watt};
use crate::core::{Telemetry, TelemetrySource, telemetry};
use crate::error::TelemetryError;

use super::signer::Signer;

const QUOTA_PATH: &str = "/iot-open/sign/device/quota/all";

const SOC: &str = "pd.soc";
const WATTS_IN: &str = "pd.wattsInSum";
const WATTS_OUT: &str = "pd.wattsOutSum";
const BATTERY_TEMP: &str = "bms_bmsStatus.temp";
const REMAIN_TIME: &str = "pd.remainTime";

pub struct EcoFlowClient {
    client: HttpClient,
    base_url: String,
    signer: Signer,
}

impl EcoFlowClient {
    pub fn new(client: HttpClient, base_url: &str, signer: Signer) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            signer,
        }
    }
}

impl TelemetrySource for EcoFlowClient {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, device_id: &str) -> Result<Telemetry, TelemetryError> {
        let params = [("sn", device_id)];
        let headers = self.signer.sign_request(&params)?;

        let mut request = self
            .client
            .get(format!("{}{}", self.base_url, QUOTA_PATH))
            .query(&params);

        for (name, value) in headers.as_pairs() {
            request = request.header(name, value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(TelemetryError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_quota(&body, device_id, DateTime::now())
    }
}

#[derive(Debug, Deserialize)]
struct QuotaResponse {
    code: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

//All or nothing: any missing or out-of-range field rejects the whole response
pub fn parse_quota(body: &str, device_id: &str, observed_at: DateTime) -> Result<Telemetry, TelemetryError> {
    let response: QuotaResponse = serde_json::from_str(body).map_err(|e| TelemetryError::Decode(e.to_string()))?;

    let code = match &response.code {
        Value::String(code) => code.clone(),
        other => other.to_string(),
    };

    if code != "0" {
        return Err(TelemetryError::Api {
            code,
            message: response.message.unwrap_or_default(),
        });
    }

    let data = response.data.ok_or(TelemetryError::MissingField("data"))?;

    let state_of_charge = Percent(required(&data, SOC)?);
    if !state_of_charge.is_valid() {
        return Err(invalid(SOC, state_of_charge.0));
    }

    let watts_in = non_negative(&data, WATTS_IN)?;
    let watts_out = non_negative(&data, WATTS_OUT)?;
    let battery_temp_c = DegreeCelsius(required(&data, BATTERY_TEMP)?);
    let remaining_seconds = optional(&data, REMAIN_TIME)?.unwrap_or(0.0);

    Ok(Telemetry {
        state_of_charge,
        watts_in,
        watts_out,
        battery_temp_c,
        remaining_minutes: telemetry::remaining_minutes(remaining_seconds),
        device_id: device_id.to_owned(),
        observed_at,
    })
}

fn required(data: &Map<String, Value>, field: &'static str) -> Result<f64, TelemetryError> {
    optional(data, field)?.ok_or(TelemetryError::MissingField(field))
}

fn optional(data: &Map<String, Value>, field: &'static str) -> Result<Option<f64>, TelemetryError> {
    match data.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| TelemetryError::InvalidField {
            field,
            value: value.to_string(),
        }),
    }
}

fn non_negative(data: &Map<String, Value>, field: &'static str) -> Result<Watt, TelemetryError> {
    let value = required(data, field)?;
    if value.is_finite() && value >= 0.0 {
        Ok(Watt(value))
    } else {
        Err(invalid(field, value))
    }
}

fn invalid(field: &'static str, value: f64) -> TelemetryError {
    TelemetryError::InvalidField {
        field,
        value: value.to_string(),
    }
}
