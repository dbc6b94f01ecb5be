pub const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Organization Atlas</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css" />
  <style>
    html, body { margin: 0; height: 100%; font-family: system-ui, sans-serif; }
    #layout { display: grid; grid-template-columns: 1fr 380px; grid-template-rows: 60% 40%; height: 100%; }
    #map { grid-column: 1; grid-row: 1; }
    #detail { grid-column: 2; grid-row: 1 / span 2; overflow-y: auto; padding: 12px; border-left: 1px solid #e5e7eb; }
    #table-wrap { grid-column: 1; grid-row: 2; overflow: auto; border-top: 1px solid #e5e7eb; }
    #filters { padding: 8px 12px; display: flex; flex-wrap: wrap; gap: 8px; align-items: center; }
    .cluster-icon { background: transparent; border: 0; }
    .org-card { border: 1px solid #e5e7eb; border-radius: 8px; padding: 10px; margin-bottom: 10px; }
    .org-type { font-size: 12px; background: #eef2ff; border-radius: 4px; padding: 2px 6px; }
    .org-table { border-collapse: collapse; width: 100%; font-size: 13px; }
    .org-table td, .org-table th { padding: 4px 8px; border-bottom: 1px solid #f3f4f6; text-align: left; }
    .more-row td { font-style: italic; color: #6b7280; }
    @media (max-width: 768px) {
      #layout { grid-template-columns: 1fr; grid-template-rows: 55% auto 45%; }
      #detail { grid-column: 1; grid-row: 2; border-left: 0; max-height: 30vh; }
      #table-wrap { grid-row: 3; }
    }
  </style>
</head>
<body>
  <div id="layout">
    <div id="map"></div>
    <aside id="detail"><p>Select a marker to see the organizations at that location.</p></aside>
    <section id="table-wrap">
      <div id="filters">
        <label><input type="radio" name="bucket" value="" checked /> All</label>
        <label><input type="radio" name="bucket" value="startup" /> Startups</label>
        <label><input type="radio" name="bucket" value="other" /> Other</label>
        <span id="categories"></span>
        <a id="export" href="/api/export.csv">Export CSV</a>
      </div>
      <div id="table"></div>
    </section>
  </div>
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <script src="https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js"></script>
  <script>
    const settings = __ATLAS_SETTINGS__;
    const compact = () => window.matchMedia("(max-width: 768px)").matches;

    const map = L.map("map").setView(settings.center, compact() ? settings.mobile_zoom : settings.zoom);
    L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
      maxZoom: 18,
      attribution: "&copy; OpenStreetMap contributors",
    }).addTo(map);

    // Merges [type, count] pairs keeping first-seen order, so the URL grows with types, not members.
    const mergeCounts = (lists) => {
      const merged = new Map();
      for (const list of lists) {
        for (const [type, n] of list) merged.set(type, (merged.get(type) || 0) + n);
      }
      return merged;
    };
    const iconFor = (counts) => {
      const query = new URLSearchParams({ preset: compact() ? "compact" : "standard" });
      let total = 0;
      for (const [type, n] of counts) {
        query.append("type", `${type}:${n}`);
        total += n;
      }
      return L.divIcon({ html: `<img src="/api/cluster-icon.svg?${query}" alt="${total}" />`, className: "cluster-icon", iconSize: null });
    };

    const clusters = L.markerClusterGroup({
      maxClusterRadius: settings.max_cluster_radius,
      iconCreateFunction: (cluster) =>
        iconFor(mergeCounts(cluster.getAllChildMarkers().map((m) => m.options.typeCounts))),
    });

    const showDetail = async (key) => {
      const res = await fetch(`/api/detail?key=${encodeURIComponent(key)}`);
      document.getElementById("detail").innerHTML = res.ok ? await res.text() : "<p>Nothing here.</p>";
    };

    fetch("/api/groups").then((r) => r.json()).then((fc) => {
      for (const feature of fc.features) {
        const [lng, lat] = feature.geometry.coordinates;
        const props = feature.properties;
        const marker = L.marker([lat, lng], { icon: iconFor(mergeCounts([props.type_counts])), typeCounts: props.type_counts });
        marker.on("click", () => showDetail(props.key));
        clusters.addLayer(marker);
      }
      map.addLayer(clusters);
    });

    const filter = { type_bucket: null, categories: [] };
    const renderCategories = (names) => {
      const holder = document.getElementById("categories");
      holder.innerHTML = "";
      for (const name of names) {
        const label = document.createElement("label");
        const box = document.createElement("input");
        box.type = "checkbox";
        box.value = name;
        box.addEventListener("change", () => {
          filter.categories = [...holder.querySelectorAll("input:checked")].map((b) => b.value);
          pushFilter();
        });
        label.append(box, " " + name);
        holder.append(label);
      }
    };
    fetch("/api/categories").then((r) => r.json()).then(renderCategories);

    // Each page owns its filter; the server keys it by the session its event stream opened.
    let session = null;
    const pushFilter = () => {
      const body = { type_bucket: filter.type_bucket, categories: filter.type_bucket === "other" ? [] : filter.categories };
      const query = new URLSearchParams();
      if (body.type_bucket) query.append("type", body.type_bucket);
      body.categories.forEach((c) => query.append("category", c));
      document.getElementById("export").href = `/api/export.csv?${query}`;
      if (session === null) return;
      fetch(`/api/filter?session=${session}`, { method: "POST", headers: { "Content-Type": "application/json" }, body: JSON.stringify(body) });
    };

    document.querySelectorAll("input[name=bucket]").forEach((radio) =>
      radio.addEventListener("change", () => {
        filter.type_bucket = radio.value || null;
        document.getElementById("categories").style.display = filter.type_bucket === "other" ? "none" : "";
        pushFilter();
      }),
    );

    const table = document.getElementById("table");
    const events = new EventSource("/api/table/events");
    events.addEventListener("session", (event) => {
      session = JSON.parse(event.data).session;
      // A reconnect opens a fresh session at the default filter.
      if (filter.type_bucket !== null || filter.categories.length > 0) pushFilter();
    });
    events.addEventListener("table", (event) => {
      table.innerHTML = JSON.parse(event.data).html;
    });

    let resizeTimer;
    const relayout = () => {
      clearTimeout(resizeTimer);
      resizeTimer = setTimeout(() => map.invalidateSize(), settings.resize_debounce_ms);
    };
    window.addEventListener("resize", relayout);
    window.addEventListener("orientationchange", relayout);
  </script>
</body>
</html>
"##;

pub const LOAD_ERROR_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Organization Atlas: data unavailable</title>
  <style>
    html, body { margin: 0; height: 100%; font-family: system-ui, sans-serif; }
    .overlay { display: flex; flex-direction: column; align-items: center; justify-content: center; height: 100%; gap: 16px; }
    pre { max-width: 80vw; white-space: pre-wrap; color: #b91c1c; }
  </style>
</head>
<body>
  <div class="overlay">
    <h1>Could not load organization data</h1>
    <pre>__ERROR_MESSAGE__</pre>
    <button onclick="window.location.reload()">Reload</button>
  </div>
</body>
</html>
"##;
