//! Deterministic local explanation for a temperature reading

/// Finish reason reported when generation hit the output token cap
pub const LENGTH_LIMITED: &str = "MAX_TOKENS";

const TRUNCATION_NOTE: &str
  = " (catatan: respons AI penuh tidak tersedia, menampilkan ringkasan lokal)";

/// Comfort band a reading falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comfort
{   Cold
  , Comfortable
  , Warm
  , Hot
}

impl Comfort
{   /// `< 18` cold, `[18, 26]` comfortable, `(26, 30]` warm, `> 30` hot
    pub fn of(reading: f64) -> Self
    {   if reading < 18.0
        {   Comfort::Cold
        } else if reading <= 26.0
        {   Comfort::Comfortable
        } else if reading <= 30.0
        {   Comfort::Warm
        } else
        {   Comfort::Hot
        }
    }

    pub fn label(self) -> &'static str
    {   match self
        {   Comfort::Cold => "dingin"
          , Comfort::Comfortable => "nyaman"
          , Comfort::Warm => "hangat"
          , Comfort::Hot => "panas"
        }
    }

    pub fn condition(self) -> &'static str
    {   match self
        {   Comfort::Cold => "lebih rendah dari batas nyaman"
          , Comfort::Comfortable => "dalam rentang ideal"
          , Comfort::Warm => "sedikit lebih tinggi dari ideal"
          , Comfort::Hot => "melampaui batas aman"
        }
    }

    pub fn advice(self) -> &'static str
    {   match self
        {   Comfort::Cold => {
              "Pertimbangkan menutup ventilasi atau menyalakan penghangat seperlunya."
            }
          , Comfort::Comfortable => {
              "Pertahankan kondisi saat ini dan pastikan sirkulasi udara tetap baik."
            }
          , Comfort::Warm => {
              "Periksa ventilasi dan kurangi sumber panas di dalam ruangan."
            }
          , Comfort::Hot => {
              "Aktifkan pendingin atau buka ventilasi untuk menurunkan suhu secepatnya."
            }
        }
    }
}

/// Round to one decimal for display; `22.0` renders as `22`
///
/// Rounds the exact decimal value, so `24.15` (stored just below) shows `24.1`.
pub fn display_reading(reading: f64) -> String
{   let fixed = format!("{:.1}", reading);
    let rounded = fixed.parse::<f64>().unwrap_or(reading);
    // avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

/// Compose the local insight text
///
/// Bucketing uses the unrounded reading. A `MAX_TOKENS` finish reason adds a
/// note that the remote answer was cut short.
pub fn compose(reading: f64, finish_reason: Option<&str>) -> String
{   let comfort = Comfort::of(reading);
    let suffix = match finish_reason
    {   Some(LENGTH_LIMITED) => TRUNCATION_NOTE
      , _ => ""
    };

    format!(
      "Suhu ruangan saat ini sekitar {}°C, terasa {} dan {}. {}{}"
    , display_reading(reading)
    , comfort.label()
    , comfort.condition()
    , comfort.advice()
    , suffix
    )
}
