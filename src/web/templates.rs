//! Static HTML pages.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Diabetes Risk Prediction</title>
</head>
<body>
  <h1>Diabetes Risk Prediction</h1>
  <form action="/predict" method="post">
    <label>Gender
      <select name="gender">
        <option value="0">Male</option>
        <option value="1">Female</option>
      </select>
    </label><br>
    <label>Age <input type="number" step="any" name="age" required></label><br>
    <label>Hypertension
      <select name="hypertension">
        <option value="0">No</option>
        <option value="1">Yes</option>
      </select>
    </label><br>
    <label>Heart disease
      <select name="heart_disease">
        <option value="0">No</option>
        <option value="1">Yes</option>
      </select>
    </label><br>
    <label>Smoking history
      <select name="smoking_history">
        <option value="0">Never</option>
        <option value="1">Current, former or unknown</option>
      </select>
    </label><br>
    <label>BMI <input type="number" step="any" name="bmi" required></label><br>
    <label>HbA1c level <input type="number" step="any" name="HbA1c_level" required></label><br>
    <label>Blood glucose level <input type="number" step="any" name="blood_glucose_level" required></label><br>
    <button type="submit">Predict</button>
  </form>
</body>
</html>
"#;

pub fn results_html(prediction: f64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Prediction</title>
</head>
<body>
  <h1>Predicted diabetes risk</h1>
  <p class="prediction">{prediction:.4}</p>
  <a href="/">Back</a>
</body>
</html>
"#
    )
}
