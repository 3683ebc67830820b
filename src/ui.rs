use crate::dispatch::Page;

pub fn render_page(page: Page) -> String {
    let nav = Page::ALL
        .iter()
        .map(|candidate| {
            let class = if *candidate == page { "tab active" } else { "tab" };
            format!(
                r#"<a class="{class}" href="/{}">{}</a>"#,
                candidate.as_str(),
                candidate.title()
            )
        })
        .collect::<Vec<_>>()
        .join("\n          ");

    PAGE_HTML
        .replace("{{PAGE}}", page.as_str())
        .replace("{{TITLE}}", page.title())
        .replace("{{NAV}}", &nav)
        .replace(
            "{{LABOR_FILTER}}",
            if page == Page::Labor { LABOR_FILTER } else { "" },
        )
}

const LABOR_FILTER: &str = r#"<label class="control">
          <span class="label">Jobs</span>
          <select id="labor-status">
            <option value="all">All</option>
            <option value="wip">WIP</option>
            <option value="completed">Completed</option>
          </select>
        </label>"#;

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}} · KPI Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef2f5;
      --bg-2: #c9d8e4;
      --ink: #22282e;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.88);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #e3ebf1 60%, #f4f7f9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1100px, 100%);
      margin: 0 auto;
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      justify-content: space-between;
      align-items: center;
      gap: 16px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 3.5vw, 2.4rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.2rem;
    }

    .tabs {
      display: flex;
      gap: 6px;
      padding: 6px;
      background: rgba(47, 72, 88, 0.08);
      border-radius: 999px;
    }

    .tab {
      border-radius: 999px;
      padding: 8px 14px;
      font-size: 0.9rem;
      font-weight: 600;
      color: #6b645d;
      text-decoration: none;
      background: transparent;
      border: none;
      cursor: pointer;
    }

    .tab.active {
      background: white;
      color: var(--accent-2);
      box-shadow: 0 8px 16px rgba(47, 72, 88, 0.12);
    }

    .controls {
      display: grid;
      grid-template-columns: auto minmax(180px, 240px) 1fr auto;
      gap: 18px;
      align-items: end;
    }

    .control {
      display: grid;
      gap: 6px;
    }

    .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #7d8790;
    }

    /* Position 0 is the newest week, drawn at the right end. */
    #slider {
      direction: rtl;
    }

    select, input[type="range"] {
      font: inherit;
      width: 100%;
    }

    select {
      padding: 8px 10px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
      background: white;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(170px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
    }

    .stat .value {
      font-size: 1.5rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 16px;
    }

    .chart-card {
      background: white;
      border-radius: 20px;
      padding: 16px;
      border: 1px solid rgba(47, 72, 88, 0.08);
    }

    .chart-card svg {
      width: 100%;
      height: 240px;
      display: block;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-bar {
      fill: var(--accent-2);
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: #7a746d;
      font-size: 11px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      background: white;
      border-radius: 16px;
      overflow: hidden;
      font-size: 0.92rem;
    }

    th, td {
      padding: 10px 12px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
      text-align: left;
    }

    th {
      cursor: pointer;
      user-select: none;
      background: rgba(47, 72, 88, 0.05);
    }

    td.num, th.num {
      text-align: right;
    }

    tr.drillable {
      cursor: pointer;
    }

    .status {
      font-size: 0.95rem;
      color: #6b645d;
      min-height: 1.2em;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    body.loading .app {
      opacity: 0.6;
    }

    @media (max-width: 760px) {
      .controls {
        grid-template-columns: 1fr;
      }
      .app {
        padding: 28px 22px;
      }
    }
  </style>
</head>
<body>
  <main class="app" data-page="{{PAGE}}">
    <header>
      <h1>{{TITLE}}</h1>
      <nav class="tabs">
          {{NAV}}
      </nav>
    </header>

    <section class="controls">
      <div class="tabs" role="tablist">
        <button class="tab active" type="button" data-mode="weekly">Weekly</button>
        <button class="tab" type="button" data-mode="monthly">Monthly</button>
      </div>
      <label class="control">
        <span class="label">Period</span>
        <select id="period"></select>
      </label>
      <label class="control">
        <span class="label">Timeline <span id="slider-label"></span></span>
        <input id="slider" type="range" min="0" max="0" value="0" />
      </label>
      {{LABOR_FILTER}}
    </section>

    <section class="panel" id="cards"></section>
    <section class="charts" id="charts"></section>
    <section id="tables"></section>
    <section id="drill"></section>

    <div class="status" id="status"></div>
  </main>

  <script>
    const page = document.querySelector('.app').dataset.page;
    const statusEl = document.getElementById('status');
    const periodEl = document.getElementById('period');
    const sliderEl = document.getElementById('slider');
    const sliderLabelEl = document.getElementById('slider-label');
    const cardsEl = document.getElementById('cards');
    const chartsEl = document.getElementById('charts');
    const tablesEl = document.getElementById('tables');
    const drillEl = document.getElementById('drill');
    const modeButtons = Array.from(document.querySelectorAll('[data-mode]'));
    const laborStatusEl = document.getElementById('labor-status');

    let current = null;

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const setLoading = (loading) => {
      document.body.classList.toggle('loading', loading);
      setStatus(loading ? 'Loading...' : '', 'info');
    };

    const escapeHtml = (value) => String(value)
      .replace(/&/g, '&amp;')
      .replace(/</g, '&lt;')
      .replace(/>/g, '&gt;')
      .replace(/"/g, '&quot;');

    const formatValue = (value, unit) => {
      const number = Number(value);
      if (Number.isNaN(number)) {
        return '--';
      }
      if (unit === 'currency') {
        return number.toLocaleString(undefined, { style: 'currency', currency: 'USD', maximumFractionDigits: 0 });
      }
      if (unit === 'percent') {
        return `${number.toFixed(1)}%`;
      }
      if (unit === 'hours') {
        return `${number.toLocaleString(undefined, { maximumFractionDigits: 1 })} h`;
      }
      return number.toLocaleString();
    };

    const renderChart = (series) => {
      const width = 600;
      const height = 240;
      const paddingX = 44;
      const paddingY = 34;
      const top = 20;
      const points = series.points.map((point) => ({ label: point.label, value: Number(point.value) }));
      if (!points.length) {
        return `<div class="chart-card"><h2>${escapeHtml(series.name)}</h2><svg viewBox="0 0 ${width} ${height}"><text class="chart-label" x="50%" y="50%" text-anchor="middle">No data</text></svg></div>`;
      }

      const values = points.map((point) => point.value);
      let min = Math.min(0, ...values);
      let max = Math.max(0, ...values);
      if (min === max) {
        max += 1;
      }
      const scaleY = (height - top - paddingY) / (max - min);
      const y = (value) => height - paddingY - (value - min) * scaleY;
      const slot = (width - paddingX * 2) / points.length;
      const x = (index) => paddingX + slot * index + slot / 2;

      let body = '';
      for (let i = 0; i <= 4; i += 1) {
        const value = min + ((max - min) * i) / 4;
        body += `<line class="chart-grid" x1="${paddingX}" y1="${y(value)}" x2="${width - paddingX}" y2="${y(value)}" />`;
        body += `<text class="chart-label" x="${paddingX - 8}" y="${y(value) + 4}" text-anchor="end">${Math.round(value)}</text>`;
      }

      if (series.kind === 'line') {
        const path = points
          .map((point, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(point.value).toFixed(2)}`)
          .join(' ');
        body += `<path class="chart-line" d="${path}" />`;
      } else {
        const barWidth = Math.max(slot * 0.6, 2);
        body += points
          .map((point, index) => {
            const yTop = Math.min(y(point.value), y(0));
            const barHeight = Math.abs(y(point.value) - y(0));
            return `<rect class="chart-bar" x="${x(index) - barWidth / 2}" y="${yTop}" width="${barWidth}" height="${barHeight}" rx="4" />`;
          })
          .join('');
      }

      const labelEvery = points.length > 8 ? 2 : 1;
      body += points
        .map((point, index) => index % labelEvery === 0
          ? `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${escapeHtml(point.label)}</text>`
          : '')
        .join('');

      return `<div class="chart-card"><h2>${escapeHtml(series.name)}</h2><svg viewBox="0 0 ${width} ${height}">${body}</svg></div>`;
    };

    const renderCell = (cell) => {
      if (cell.kind === 'number') {
        return `<td class="num">${Number(cell.value).toLocaleString(undefined, { maximumFractionDigits: 2 })}</td>`;
      }
      if (cell.kind === 'text') {
        return `<td>${escapeHtml(cell.value)}</td>`;
      }
      return '<td></td>';
    };

    const renderTable = (table, drillLevel) => {
      const head = table.columns
        .map((column) => {
          const active = table.sort && table.sort.column === column.key;
          const arrow = active ? (table.sort.order === 'asc' ? ' ▲' : ' ▼') : '';
          const next = active && table.sort.order === 'asc' ? 'desc' : 'asc';
          return `<th class="${column.numeric ? 'num' : ''}" data-table="${table.key}" data-column="${column.key}" data-order="${next}">${escapeHtml(column.label)}${arrow}</th>`;
        })
        .join('');
      const rows = table.rows
        .map((row) => {
          const key = row[0] && row[0].kind === 'text' ? row[0].value : '';
          const attrs = drillLevel && key
            ? ` class="drillable" data-level="${drillLevel}" data-key="${escapeHtml(key)}"`
            : '';
          return `<tr${attrs}>${row.map(renderCell).join('')}</tr>`;
        })
        .join('');
      return `<table><thead><tr>${head}</tr></thead><tbody>${rows}</tbody></table>`;
    };

    const renderSelector = (selector) => {
      if (!selector) {
        periodEl.innerHTML = '';
        sliderEl.disabled = true;
        sliderLabelEl.textContent = '';
        return;
      }
      modeButtons.forEach((button) => {
        button.classList.toggle('active', button.dataset.mode === selector.granularity);
      });
      periodEl.innerHTML = selector.options
        .map((option) => `<option value="${escapeHtml(option.value)}">${escapeHtml(option.label)}</option>`)
        .join('');
      periodEl.value = selector.selected;
      sliderEl.disabled = false;
      sliderEl.max = String(selector.slider.max);
      sliderEl.value = String(selector.slider.index);
      sliderLabelEl.textContent = selector.slider.label;
    };

    const renderView = (view) => {
      drillEl.innerHTML = '';
      if (!view) {
        cardsEl.innerHTML = '<p>No reporting periods available.</p>';
        chartsEl.innerHTML = '';
        tablesEl.innerHTML = '';
        return;
      }
      cardsEl.innerHTML = view.cards
        .map((card) => `<div class="stat"><span class="label">${escapeHtml(card.label)}</span><span class="value">${formatValue(card.value, card.unit)}</span></div>`)
        .join('');

      const series = [view.margin_trend, view.revenue_trend, view.by_product, view.trend, view.top_jobs].filter(Boolean);
      chartsEl.innerHTML = series.map(renderChart).join('');
      tablesEl.innerHTML = view.table ? renderTable(view.table, view.page === 'margin' ? 'product' : null) : '';
    };

    const render = (data) => {
      current = data;
      renderSelector(data.selector);
      renderView(data.view);
      if (laborStatusEl) {
        laborStatusEl.value = data.labor_status;
      }
    };

    const call = async (method, url, body) => {
      setLoading(true);
      try {
        const res = await fetch(url, {
          method,
          headers: { 'content-type': 'application/json' },
          body: body === undefined ? undefined : JSON.stringify(body)
        });
        if (!res.ok) {
          const msg = await res.text();
          throw new Error(msg || 'Request failed');
        }
        return await res.json();
      } finally {
        setLoading(false);
      }
    };

    const send = (url, body) => call('POST', url, body)
      .then(render)
      .catch((err) => {
        setStatus(err.message, 'error');
        alert(err.message);
        if (current) {
          renderSelector(current.selector);
        }
      });

    modeButtons.forEach((button) => {
      button.addEventListener('click', () => send('/api/session/granularity', { mode: button.dataset.mode }));
    });

    periodEl.addEventListener('change', () => send('/api/session/period', { value: periodEl.value }));

    sliderEl.addEventListener('input', () => {
      const index = Number(sliderEl.value);
      const option = current && current.selector ? current.selector.options : [];
      sliderLabelEl.textContent = option[index] && current.selector.granularity === 'weekly' ? option[index].label : '';
    });

    sliderEl.addEventListener('change', () => {
      send('/api/session/slider', { index: Number(sliderEl.value) });
    });

    if (laborStatusEl) {
      laborStatusEl.addEventListener('change', () => send('/api/session/labor-status', { status: laborStatusEl.value }));
    }

    const drillTitles = { product: 'by category', category: 'jobs', job: 'cost breakdown' };

    const openDrill = (row) => {
      if (!row || !row.dataset.key) {
        return;
      }
      call('GET', `/api/session/drill/${row.dataset.level}/${encodeURIComponent(row.dataset.key)}`)
        .then((drill) => {
          const cards = drill.cards
            .map((card) => `<div class="stat"><span class="label">${escapeHtml(card.label)}</span><span class="value">${formatValue(card.value, card.unit)}</span></div>`)
            .join('');
          drillEl.innerHTML = `<h2>${escapeHtml(drill.subject)} ${drillTitles[drill.level]}</h2><div class="panel">${cards}</div>${renderTable(drill.table, drill.drill_into)}`;
        })
        .catch((err) => {
          setStatus(err.message, 'error');
          alert(err.message);
        });
    };

    tablesEl.addEventListener('click', (event) => {
      const header = event.target.closest('th');
      if (header) {
        send('/api/session/sort', {
          table: header.dataset.table,
          column: header.dataset.column,
          order: header.dataset.order
        });
        return;
      }
      openDrill(event.target.closest('tr.drillable'));
    });

    drillEl.addEventListener('click', (event) => {
      openDrill(event.target.closest('tr.drillable'));
    });

    send(`/api/session/open/${page}`);
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_shell_marks_active_tab_and_page() {
        let html = render_page(Page::Margin);
        assert!(html.contains(r#"data-page="margin""#));
        assert!(html.contains(r#"<a class="tab active" href="/margin">Gross Margin</a>"#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn labor_filter_only_on_labor_page() {
        assert!(render_page(Page::Labor).contains(r#"id="labor-status""#));
        assert!(!render_page(Page::Revenue).contains(r#"id="labor-status""#));
    }

    #[test]
    fn margin_rows_open_the_product_drill() {
        let html = render_page(Page::Margin);
        assert!(html.contains("view.page === 'margin' ? 'product' : null"));
        assert!(html.contains("/api/session/drill/${row.dataset.level}/"));
    }
}
