pub const SYSTEM: &str = r#"Goal: read every position printed on the restaurant bill in the image and output it as JSON.
Output only the JSON document, without markdown fences or any other symbols.
Use exactly this shape:
{
  "items": [
    {
      "id": position number in print order (int, starting at 1),
      "name": position name as printed (str),
      "price": price per unit (float),
      "count": quantity (int),
      "total": line total (float)
    }
  ],
  "total": grand total of the bill (float)
}"#;
